use cartprice_core::config::AppConfig;
use cartprice_core::domain::cart::{BundleRole, Cart, CartId, CartLine, LineId, ProductId, TaxCategoryId};
use cartprice_core::domain::customer::{Customer, StoreId};
use cartprice_core::domain::discount::{Discount, DiscountId, DiscountRule, DiscountType};
use cartprice_core::domain::gift_card::{GiftCard, GiftCardId};
use cartprice_core::domain::shipping::FixedRateProvider;
use cartprice_core::pricing::shipping::FreeShippingReason;
use cartprice_core::pricing::{
    Collaborators, OrderTotalCalculator, Resolution, TaxBucket, UnresolvableReason,
};
use cartprice_core::store::InMemoryStore;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

fn line(id: &str, quantity: u32, unit_price: Decimal, tax_category: Option<&str>) -> CartLine {
    CartLine {
        id: LineId(id.to_string()),
        product_id: ProductId(format!("sku-{id}")),
        quantity,
        tax_category: tax_category.map(|category| TaxCategoryId(category.to_string())),
        unit_price,
        customer_entered_price: None,
        is_ship_enabled: true,
        is_free_shipping: false,
        additional_shipping_charge: Decimal::ZERO,
        bundle: BundleRole::Standalone,
    }
}

fn cart(customer: Customer, lines: Vec<CartLine>) -> Cart {
    Cart {
        id: CartId("cart-1".to_string()),
        store_id: StoreId("main".to_string()),
        customer,
        lines,
        checkout_attributes: Vec::new(),
        is_recurring: false,
    }
}

fn store(rates: &[(&str, Decimal)]) -> InMemoryStore {
    let mut store = InMemoryStore::default();
    for (category, rate) in rates {
        store.tax_rates.insert(TaxCategoryId((*category).to_string()), *rate);
    }
    store
}

fn flat_rate(rate: Decimal) -> FixedRateProvider {
    FixedRateProvider {
        system_name: "flat".to_string(),
        rate,
        ignore_additional_charges: false,
    }
}

fn gift_card(id: &str, balance: Decimal, issued_day: u32) -> GiftCard {
    GiftCard {
        id: GiftCardId(id.to_string()),
        code: format!("GC-{id}"),
        remaining_balance: balance,
        is_active: true,
        created_at: Utc
            .with_ymd_and_hms(2026, 3, issued_day, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    }
}

fn free_shipping_customer(id: &str) -> Customer {
    let mut customer = Customer::new(id);
    customer.free_shipping = true;
    customer
}

#[test]
fn subtotal_discount_is_prorated_across_tax_bucket() {
    let mut store = store(&[("standard", Decimal::new(19, 2))]);
    store.discounts.push(Discount {
        id: DiscountId("ten-off".to_string()),
        name: "10% off the order subtotal".to_string(),
        discount_type: DiscountType::OrderSubtotal,
        rule: DiscountRule::Percentage { percentage: Decimal::TEN, maximum_amount: None },
    });
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        Customer::new("c-1"),
        vec![line("a", 1, Decimal::new(10_000, 2), Some("standard"))],
    );

    let subtotal = calculator.compute_subtotal(&cart);

    assert_eq!(subtotal.discount_amount, Decimal::new(1000, 2));
    assert_eq!(subtotal.excl_tax_after_discount, Decimal::new(9000, 2));
    assert_eq!(subtotal.tax_bucket.get(Decimal::new(19, 2)), Some(Decimal::new(1710, 2)));
    assert_eq!(subtotal.tax_bucket.len(), 1);
    assert_eq!(subtotal.incl_tax_after_discount, Decimal::new(10_710, 2));
    assert_eq!(subtotal.applied_discount.map(|discount| discount.id.0), Some("ten-off".to_string()));
}

#[test]
fn shipping_surcharge_is_taxed_at_shipping_category() {
    let mut store = store(&[("standard", Decimal::new(19, 2))]);
    store.fixed_rate_providers.push(flat_rate(Decimal::new(500, 2)));
    let mut config = AppConfig::default();
    config.tax.shipping_is_taxable = true;
    config.tax.shipping_tax_category = Some("standard".to_string());
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let mut item = line("a", 1, Decimal::new(2000, 2), Some("standard"));
    item.additional_shipping_charge = Decimal::new(200, 2);
    let cart = cart(Customer::new("c-1"), vec![item]);

    let shipping = calculator.compute_shipping_total(&cart).resolved().expect("resolvable");

    assert_eq!(shipping.excl_tax, Decimal::new(700, 2));
    assert_eq!(shipping.tax_amount(), Decimal::new(133, 2));
    assert_eq!(shipping.incl_tax, Decimal::new(833, 2));
    assert_eq!(shipping.free_shipping, None);
}

#[test]
fn gift_cards_are_consumed_oldest_first_against_grand_total() {
    let mut store = store(&[]);
    let customer = free_shipping_customer("c-1");
    store.gift_cards.insert(
        customer.id.clone(),
        vec![
            gift_card("second", Decimal::new(4000, 2), 12),
            gift_card("first", Decimal::new(3000, 2), 2),
        ],
    );
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(customer, vec![line("a", 5, Decimal::new(1000, 2), None)]);

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert_eq!(order.applied_gift_cards.len(), 2);
    let first = &order.applied_gift_cards[0];
    let second = &order.applied_gift_cards[1];
    assert_eq!(first.gift_card.id.0, "first");
    assert_eq!(first.amount_used, Decimal::new(3000, 2));
    assert_eq!(second.amount_used, Decimal::new(2000, 2));
    assert_eq!(second.balance_left(), Decimal::new(2000, 2));
    assert_eq!(order.total, Decimal::ZERO);
}

#[test]
fn reward_points_cover_the_remaining_total() {
    let mut store = store(&[]);
    let mut customer = free_shipping_customer("c-1");
    customer.use_reward_points = true;
    store.reward_points.insert(customer.id.clone(), 1000);
    let mut config = AppConfig::default();
    config.reward_points.enabled = true;
    config.reward_points.exchange_rate = Decimal::new(2, 2);
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(customer, vec![line("a", 3, Decimal::new(500, 2), None)]);

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert_eq!(order.redeemed_points, 750);
    assert_eq!(order.redeemed_points_amount, Decimal::new(1500, 2));
    assert_eq!(order.total, Decimal::ZERO);
}

#[test]
fn reward_points_are_ignored_when_disabled_in_config() {
    let mut store = store(&[]);
    let mut customer = free_shipping_customer("c-1");
    customer.use_reward_points = true;
    store.reward_points.insert(customer.id.clone(), 1000);
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(customer, vec![line("a", 3, Decimal::new(500, 2), None)]);

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert_eq!(order.redeemed_points, 0);
    assert_eq!(order.total, Decimal::new(1500, 2));
}

#[test]
fn vat_exempt_customer_pays_no_tax() {
    let mut store = store(&[("standard", Decimal::new(19, 2))]);
    let customer = free_shipping_customer("exempt");
    store.vat_exempt_customers.insert(customer.id.clone());
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(customer, vec![line("a", 2, Decimal::new(2500, 2), Some("standard"))]);

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert_eq!(order.tax.total, Decimal::ZERO);
    assert_eq!(order.tax.bucket, TaxBucket::zero());
    assert_eq!(order.tax_rates(), "0:0.00; ");
    assert_eq!(order.total, Decimal::new(5000, 2));

    let subtotal = calculator.compute_subtotal(&cart);
    assert_eq!(subtotal.tax_bucket, TaxBucket::zero());
    assert_eq!(subtotal.tax_bucket, calculator.compute_tax_total(&cart, true).bucket);
}

#[test]
fn subtotal_threshold_makes_shipping_free() {
    let mut store = store(&[("standard", Decimal::new(19, 2))]);
    store.fixed_rate_providers.push(flat_rate(Decimal::new(995, 2)));
    let mut config = AppConfig::default();
    config.shipping.free_shipping_over_enabled = true;
    config.shipping.free_shipping_over_value = Decimal::new(5000, 2);
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        Customer::new("c-1"),
        vec![line("a", 3, Decimal::new(2000, 2), Some("standard"))],
    );

    let shipping = calculator.compute_shipping_total(&cart).resolved().expect("resolvable");

    assert_eq!(shipping.excl_tax, Decimal::ZERO);
    assert_eq!(shipping.incl_tax, Decimal::ZERO);
    assert_eq!(shipping.free_shipping, Some(FreeShippingReason::SubtotalThreshold));
}

#[test]
fn ambiguous_providers_leave_grand_total_unresolvable() {
    let mut store = store(&[("standard", Decimal::new(19, 2))]);
    store.fixed_rate_providers.push(flat_rate(Decimal::new(500, 2)));
    store.fixed_rate_providers.push(flat_rate(Decimal::new(700, 2)));
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        Customer::new("c-1"),
        vec![line("a", 1, Decimal::new(1000, 2), Some("standard"))],
    );

    assert_eq!(
        calculator.compute_grand_total(&cart),
        Resolution::Unresolvable(UnresolvableReason::AmbiguousShippingProviders { active: 2 })
    );
}

#[test]
fn recurring_carts_skip_gift_cards() {
    let mut store = store(&[]);
    let customer = free_shipping_customer("c-1");
    store.gift_cards.insert(customer.id.clone(), vec![gift_card("only", Decimal::new(900, 2), 1)]);
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let mut cart = cart(customer, vec![line("a", 1, Decimal::new(2000, 2), None)]);
    cart.is_recurring = true;

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert!(order.applied_gift_cards.is_empty());
    assert_eq!(order.total, Decimal::new(2000, 2));
}

#[test]
fn order_total_discount_applies_after_tax() {
    let mut store = store(&[("standard", Decimal::new(10, 2))]);
    store.fixed_rate_providers.push(flat_rate(Decimal::new(500, 2)));
    store.discounts.push(Discount {
        id: DiscountId("five-off".to_string()),
        name: "5.00 off the order".to_string(),
        discount_type: DiscountType::OrderTotal,
        rule: DiscountRule::Amount { amount: Decimal::new(500, 2) },
    });
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        Customer::new("c-1"),
        vec![line("a", 4, Decimal::new(1000, 2), Some("standard"))],
    );

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    // 40.00 subtotal + 5.00 shipping + 4.00 tax - 5.00 discount
    assert_eq!(order.order_discount_amount, Decimal::new(500, 2));
    assert_eq!(order.total, Decimal::new(4400, 2));
    assert_eq!(order.applied_discounts.len(), 1);
    assert_eq!(
        order.trace.step("order_discount").map(|step| step.amount),
        Some(Decimal::new(500, 2))
    );
}

#[test]
fn tax_bucket_matches_incl_minus_excl_for_mixed_rates() {
    let mut store = store(&[("standard", Decimal::new(19, 2)), ("reduced", Decimal::new(7, 2))]);
    store.discounts.push(Discount {
        id: DiscountId("three-off".to_string()),
        name: "3.00 off".to_string(),
        discount_type: DiscountType::OrderSubtotal,
        rule: DiscountRule::Amount { amount: Decimal::new(300, 2) },
    });
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        Customer::new("c-1"),
        vec![
            line("book", 3, Decimal::new(1299, 2), Some("reduced")),
            line("lamp", 1, Decimal::new(4999, 2), Some("standard")),
        ],
    );

    let subtotal = calculator.compute_subtotal(&cart);

    assert!(subtotal.discount_amount <= subtotal.excl_tax_before_discount);
    assert_eq!(subtotal.tax_bucket.len(), 2);
    assert_eq!(
        subtotal.tax_bucket.total(),
        subtotal.incl_tax_after_discount - subtotal.excl_tax_after_discount
    );
}

#[test]
fn prices_including_tax_keep_gross_totals() {
    let mut store = store(&[("standard", Decimal::new(25, 2))]);
    store.prices_include_tax = true;
    let config = AppConfig::default();
    let calculator = OrderTotalCalculator::new(&config, Collaborators::from_store(&store));
    let cart = cart(
        free_shipping_customer("c-1"),
        vec![line("a", 1, Decimal::new(12_500, 2), Some("standard"))],
    );

    let order = calculator.compute_grand_total(&cart).resolved().expect("resolvable");

    assert_eq!(order.subtotal.excl_tax_after_discount, Decimal::new(10_000, 2));
    assert_eq!(order.tax.total, Decimal::new(2500, 2));
    assert_eq!(order.total, Decimal::new(12_500, 2));
}
