//! End-to-end tests for the sync validation path: cascade behavior,
//! conditions, collection fan-out, child validators, rule-set filtering
//! and failure metadata.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use rulekit::prelude::*;
use serde::Serialize;

#[derive(Serialize, Clone)]
struct Address {
    street: String,
    city: String,
}

#[derive(Serialize, Clone)]
struct Order {
    reference: String,
    total: f64,
}

#[derive(Serialize, Clone)]
struct Customer {
    name: String,
    has_discount: bool,
    discount: f64,
    address: Address,
    shipping: Option<Address>,
    orders: Vec<Order>,
}

fn valid_customer() -> Customer {
    Customer {
        name: "Ada".into(),
        has_discount: false,
        discount: 0.0,
        address: Address {
            street: "1 Main St".into(),
            city: "Springfield".into(),
        },
        shipping: None,
        orders: vec![Order {
            reference: "ord-1".into(),
            total: 10.0,
        }],
    }
}

fn address_validator() -> Arc<Validator<Address>> {
    Arc::new(
        Validator::new()
            .rule(
                PropertyRule::new("Street", |a: &Address| &a.street)
                    .must("NotEmpty", |_, s: &String| !s.is_empty()),
            )
            .rule(
                PropertyRule::new("City", |a: &Address| &a.city)
                    .must("NotEmpty", |_, s: &String| !s.is_empty()),
            ),
    )
}

fn order_validator() -> Arc<Validator<Order>> {
    Arc::new(
        Validator::new()
            .rule(
                PropertyRule::new("Reference", |o: &Order| &o.reference)
                    .must("NotEmpty", |_, s: &String| !s.is_empty()),
            )
            .rule(
                PropertyRule::new("Total", |o: &Order| &o.total)
                    .must("Positive", |_, t: &f64| *t > 0.0),
            ),
    )
}

fn failure_paths(report: &ValidationReport) -> Vec<&str> {
    report
        .failures()
        .iter()
        .map(|f| f.property_name.as_str())
        .collect()
}

// ===== basic outcomes =====

#[test]
fn valid_model_produces_empty_report() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty()),
    );
    let report = validator.validate(&valid_customer()).unwrap();
    assert!(report.is_valid());
    assert!(report.is_complete());
}

#[test]
fn continue_cascade_collects_every_failure() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty())
            .must("MinLength", |_, s: &String| s.len() >= 3),
    );
    let mut model = valid_customer();
    model.name = String::new();

    let report = validator.validate(&model).unwrap();
    let codes: Vec<_> = report
        .failures()
        .iter()
        .map(|f| f.error_code.as_ref())
        .collect();
    assert_eq!(codes, vec!["NotEmpty", "MinLength"]);
}

#[test]
fn stop_on_first_failure_never_runs_later_units() {
    let later_calls = Arc::new(AtomicUsize::new(0));
    let calls = Arc::clone(&later_calls);

    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty())
            .must("MinLength", move |_, s: &String| {
                calls.fetch_add(1, Ordering::SeqCst);
                s.len() >= 3
            })
            .cascade(CascadeMode::StopOnFirstFailure),
    );
    let mut model = valid_customer();
    model.name = String::new();

    let report = validator.validate(&model).unwrap();
    assert_eq!(report.failures().len(), 1);
    assert_eq!(later_calls.load(Ordering::SeqCst), 0);
}

// ===== conditions =====

#[test]
fn when_skips_the_rule_on_a_false_condition() {
    let validator = Validator::new().rule(
        PropertyRule::new("Discount", |c: &Customer| &c.discount)
            .must("Positive", |_, d: &f64| *d > 0.0)
            .when(|c: &Customer| c.has_discount),
    );
    // has_discount is false, so the zero discount is never checked
    let report = validator.validate(&valid_customer()).unwrap();
    assert!(report.is_valid());

    let mut model = valid_customer();
    model.has_discount = true;
    let report = validator.validate(&model).unwrap();
    assert_eq!(failure_paths(&report), vec!["Discount"]);
}

#[test]
fn unless_inverts_the_condition() {
    let validator = Validator::new().rule(
        PropertyRule::new("Discount", |c: &Customer| &c.discount)
            .must("Positive", |_, d: &f64| *d > 0.0)
            .unless(|c: &Customer| !c.has_discount),
    );
    let report = validator.validate(&valid_customer()).unwrap();
    assert!(report.is_valid());
}

#[test]
fn when_current_gates_only_the_most_recent_unit() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty())
            .must("MinLength", |_, s: &String| s.len() >= 3)
            .when_current(|c: &Customer| c.has_discount),
    );
    let mut model = valid_customer();
    model.name = String::new();

    // MinLength is gated off; NotEmpty still runs
    let report = validator.validate(&model).unwrap();
    let codes: Vec<_> = report
        .failures()
        .iter()
        .map(|f| f.error_code.as_ref())
        .collect();
    assert_eq!(codes, vec!["NotEmpty"]);
}

#[test]
fn unless_current_gates_only_the_most_recent_unit() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty())
            .must("MinLength", |_, s: &String| s.len() >= 3)
            .unless_current(|c: &Customer| !c.has_discount),
    );
    let mut model = valid_customer();
    model.name = String::new();

    // the unless condition holds, so MinLength is skipped
    let report = validator.validate(&model).unwrap();
    let codes: Vec<_> = report
        .failures()
        .iter()
        .map(|f| f.error_code.as_ref())
        .collect();
    assert_eq!(codes, vec!["NotEmpty"]);

    model.has_discount = true;
    let report = validator.validate(&model).unwrap();
    let codes: Vec<_> = report
        .failures()
        .iter()
        .map(|f| f.error_code.as_ref())
        .collect();
    assert_eq!(codes, vec!["NotEmpty", "MinLength"]);
}

#[test]
fn rule_condition_is_evaluated_once_per_run() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evaluations);

    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0)
            .when(move |_: &Customer| {
                counter.fetch_add(1, Ordering::SeqCst);
                true
            }),
    );
    let mut model = valid_customer();
    model.orders = vec![
        Order {
            reference: "a".into(),
            total: 1.0,
        },
        Order {
            reference: "b".into(),
            total: 2.0,
        },
        Order {
            reference: "c".into(),
            total: 3.0,
        },
    ];

    let report = validator.validate(&model).unwrap();
    assert!(report.is_valid());
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);
}

#[test]
fn unit_condition_is_evaluated_once_per_rule_over_a_collection() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&evaluations);

    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0)
            .must("HasReference", |_, o: &Order| !o.reference.is_empty())
            .when_current(move |_: &Customer| {
                counter.fetch_add(1, Ordering::SeqCst);
                false
            }),
    );
    let mut model = valid_customer();
    model.orders = (0..3)
        .map(|_| Order {
            reference: String::new(),
            total: 1.0,
        })
        .collect();

    // HasReference is gated off for the whole run, and its condition
    // fires once for the rule, not once per element
    let report = validator.validate(&model).unwrap();
    assert!(report.is_valid());
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);
}

// ===== collection fan-out =====

#[test]
fn collection_failures_carry_indexed_paths() {
    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0),
    );
    let mut model = valid_customer();
    model.orders = vec![
        Order {
            reference: "a".into(),
            total: -1.0,
        },
        Order {
            reference: "b".into(),
            total: 5.0,
        },
        Order {
            reference: "c".into(),
            total: -2.0,
        },
    ];

    let report = validator.validate(&model).unwrap();
    assert_eq!(failure_paths(&report), vec!["Orders[0]", "Orders[2]"]);
}

#[test]
fn collection_stop_on_first_failure_is_per_element() {
    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0)
            .must("HasReference", |_, o: &Order| !o.reference.is_empty())
            .cascade(CascadeMode::StopOnFirstFailure),
    );
    let mut model = valid_customer();
    model.orders = vec![
        // fails both units; only the first is reported
        Order {
            reference: String::new(),
            total: -1.0,
        },
        // later element is still visited
        Order {
            reference: String::new(),
            total: 5.0,
        },
    ];

    let report = validator.validate(&model).unwrap();
    let seen: Vec<_> = report
        .failures()
        .iter()
        .map(|f| (f.property_name.as_str(), f.error_code.as_ref()))
        .collect();
    assert_eq!(
        seen,
        vec![("Orders[0]", "Positive"), ("Orders[1]", "HasReference")]
    );
}

#[test]
fn empty_collection_is_valid() {
    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0),
    );
    let mut model = valid_customer();
    model.orders.clear();

    let report = validator.validate(&model).unwrap();
    assert!(report.is_valid());
}

#[test]
fn absent_optional_collection_is_valid() {
    #[derive(Serialize)]
    struct Invoice {
        lines: Option<Vec<Order>>,
    }

    let validator = Validator::new().rule(
        CollectionRule::from_option("Lines", |i: &Invoice| i.lines.as_deref())
            .must("Positive", |_, o: &Order| o.total > 0.0),
    );

    let report = validator.validate(&Invoice { lines: None }).unwrap();
    assert!(report.is_valid());

    let invoice = Invoice {
        lines: Some(vec![Order {
            reference: "a".into(),
            total: -1.0,
        }]),
    };
    let report = validator.validate(&invoice).unwrap();
    assert_eq!(failure_paths(&report), vec!["Lines[0]"]);
}

#[test]
fn missing_collection_name_is_a_configuration_error() {
    let validator = Validator::new().rule(
        CollectionRule::from_slice("", |c: &Customer| c.orders.as_slice())
            .must("Positive", |_, o: &Order| o.total > 0.0),
    );
    let err = validator.validate(&valid_customer()).unwrap_err();
    assert!(matches!(err, RuleError::MissingPropertyName { .. }));
}

// ===== child validators =====

#[test]
fn child_validator_prefixes_failures_with_the_property_name() {
    let validator = Validator::new().rule(
        PropertyRule::new("Address", |c: &Customer| &c.address)
            .child_validator(address_validator()),
    );
    let mut model = valid_customer();
    model.address.street = String::new();

    let report = validator.validate(&model).unwrap();
    assert_eq!(failure_paths(&report), vec!["Address.Street"]);
}

#[test]
fn optional_child_absent_is_not_a_failure() {
    let validator = Validator::new().rule(
        PropertyRule::new("Shipping", |c: &Customer| &c.shipping)
            .child_validator_opt(address_validator()),
    );
    let report = validator.validate(&valid_customer()).unwrap();
    assert!(report.is_valid());

    let mut model = valid_customer();
    model.shipping = Some(Address {
        street: String::new(),
        city: "Springfield".into(),
    });
    let report = validator.validate(&model).unwrap();
    assert_eq!(failure_paths(&report), vec!["Shipping.Street"]);
}

#[test]
fn collection_child_validator_uses_indexed_paths_without_double_prefix() {
    let validator = Validator::new().rule(
        CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
            .child_validator(order_validator()),
    );
    let mut model = valid_customer();
    model.orders = vec![
        Order {
            reference: "ok".into(),
            total: 1.0,
        },
        Order {
            reference: String::new(),
            total: -2.0,
        },
    ];

    let report = validator.validate(&model).unwrap();
    assert_eq!(
        failure_paths(&report),
        vec!["Orders[1].Reference", "Orders[1].Total"]
    );
}

#[test]
fn provider_child_validator_can_skip_values() {
    let rules = address_validator();
    let validator = Validator::new().rule(
        PropertyRule::new("Address", |c: &Customer| &c.address).nested(
            ChildAdaptor::with_provider(move |a: &Address| {
                if a.city.is_empty() {
                    None
                } else {
                    Some(Arc::clone(&rules))
                }
            }),
        ),
    );

    // no rule set resolved: the broken street goes unchecked
    let mut model = valid_customer();
    model.address.street = String::new();
    model.address.city = String::new();
    let report = validator.validate(&model).unwrap();
    assert!(report.is_valid());

    model.address.city = "Springfield".into();
    let report = validator.validate(&model).unwrap();
    assert_eq!(failure_paths(&report), vec!["Address.Street"]);
}

#[test]
fn nested_child_validators_compose_paths() {
    let customer_validator = Arc::new(Validator::new().rule(
        PropertyRule::new("Address", |c: &Customer| &c.address)
            .child_validator(address_validator()),
    ));

    #[derive(Serialize)]
    struct Account {
        owner: Customer,
    }

    let validator = Validator::new().rule(
        PropertyRule::new("Owner", |a: &Account| &a.owner).child_validator(customer_validator),
    );
    let mut owner = valid_customer();
    owner.address.city = String::new();

    let report = validator.validate(&Account { owner }).unwrap();
    assert_eq!(failure_paths(&report), vec!["Owner.Address.City"]);
}

// ===== rule-set filtering =====

fn tagged_validator() -> Validator<Customer> {
    Validator::new()
        .rule(
            PropertyRule::new("Name", |c: &Customer| &c.name)
                .must("NotEmpty", |_, s: &String| !s.is_empty()),
        )
        .rule(
            PropertyRule::new("Discount", |c: &Customer| &c.discount)
                .must("Positive", |_, d: &f64| *d > 0.0)
                .in_rule_set("discounts"),
        )
}

#[rstest]
#[case::default_set(RuleSetFilter::Default, vec!["Name"])]
#[case::named_set(RuleSetFilter::named(["discounts"]), vec!["Discount"])]
#[case::named_plus_default(RuleSetFilter::named(["default", "discounts"]), vec!["Name", "Discount"])]
#[case::everything(RuleSetFilter::All, vec!["Name", "Discount"])]
fn filter_selects_rules_by_tag(#[case] filter: RuleSetFilter, #[case] expected: Vec<&str>) {
    let mut model = valid_customer();
    model.name = String::new();
    model.discount = -1.0;

    let report = tagged_validator().validate_filtered(&model, filter).unwrap();
    assert_eq!(failure_paths(&report), expected);
}

// ===== failure metadata =====

#[test]
fn metadata_shapes_the_failure() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("MinLength", |_, s: &String| s.len() >= 3)
            .with_message("'{PropertyName}' must be at least {Min} characters, got {PropertyValue}")
            .with_placeholder("Min", "3")
            .with_error_code("name_too_short")
            .with_severity(Severity::Warning)
            .with_state(|c: &Customer, _| serde_json::json!({ "has_discount": c.has_discount })),
    );
    let mut model = valid_customer();
    model.name = "x".into();

    let report = validator.validate(&model).unwrap();
    let failure = &report.failures()[0];
    assert_eq!(
        failure.error_message,
        "'Name' must be at least 3 characters, got \"x\""
    );
    assert_eq!(failure.error_code.as_ref(), "name_too_short");
    assert_eq!(failure.severity, Severity::Warning);
    assert_eq!(failure.attempted_value, serde_json::json!("x"));
    assert_eq!(
        failure.custom_state,
        Some(serde_json::json!({ "has_discount": false }))
    );
}

#[test]
fn default_message_and_code_fall_back_to_the_unit_name() {
    let validator = Validator::new().rule(
        PropertyRule::new("Name", |c: &Customer| &c.name)
            .must("NotEmpty", |_, s: &String| !s.is_empty()),
    );
    let mut model = valid_customer();
    model.name = String::new();

    let report = validator.validate(&model).unwrap();
    let failure = &report.failures()[0];
    assert_eq!(
        failure.error_message,
        "The specified condition was not met for 'Name'."
    );
    assert_eq!(failure.error_code.as_ref(), "NotEmpty");
}

// ===== determinism =====

mod determinism {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn repeated_runs_yield_identical_reports(
            totals in proptest::collection::vec(-100.0f64..100.0, 0..6),
            name in ".{0,12}",
        ) {
            let mut model = valid_customer();
            model.name = name;
            model.orders = totals
                .iter()
                .map(|t| Order { reference: "r".into(), total: *t })
                .collect();

            let validator = Validator::new()
                .rule(
                    PropertyRule::new("Name", |c: &Customer| &c.name)
                        .must("NotEmpty", |_, s: &String| !s.is_empty()),
                )
                .rule(
                    CollectionRule::from_slice("Orders", |c: &Customer| c.orders.as_slice())
                        .must("Positive", |_, o: &Order| o.total > 0.0),
                );

            let first = validator.validate(&model).unwrap();
            let second = validator.validate(&model).unwrap();
            prop_assert_eq!(first.failures(), second.failures());
        }
    }
}
