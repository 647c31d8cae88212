//! End-to-end pipeline behavior over the Phone / User validators.

mod common;

use common::{Phone, User, fixture, pwd_hash};
use outpost_validator::prelude::*;
use outpost_validator::Stage;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn dataset() -> Value {
    json!({
        "name": "User 1",
        "pwd": "fafasges",
        "contact": {
            "id": 1,
            "number": "+79996465214"
        }
    })
}

// ============================================================================
// EXPORT / MAP
// ============================================================================

#[test]
fn validate_and_map_to_record() {
    let f = fixture();
    let user: User = f.create_user.map(dataset()).unwrap();

    assert_eq!(
        user,
        User {
            id: None,
            name: "User 1".into(),
            pwd: "fafasges".into(),
            contact: Phone {
                id: Some(1),
                number: "+79996465214".into(),
            },
            pwd_hash: None,
        }
    );
}

#[test]
fn export_contains_present_fields_only() {
    let f = fixture();
    let data = f.create_user.validation_results(dataset()).unwrap();
    assert_eq!(Value::Object(data), dataset());
}

#[test]
fn nested_values_are_normalized() {
    let f = fixture();
    let data = f
        .user_validator
        .validation_results(json!({"contact": {"id": " 12 ", "number": "+7 999 646-52-14"}}))
        .unwrap();
    assert_eq!(
        data["contact"],
        json!({"id": 12, "number": "+79996465214"})
    );
}

#[test]
fn missing_value_policy_fills_records() {
    let f = fixture();
    let name = f.field("name");

    let omit = Validator::derive(&f.user_validator, "OmitValidator")
        .missing_value(MissingValue::Omit)
        .build()
        .unwrap();
    let record = omit.validate(json!({"name": "Ann"})).unwrap().to_record().unwrap();
    assert_eq!(record, json!({"name": "Ann"}));

    let filled = Validator::derive(&f.user_validator, "FilledValidator")
        .missing_value(MissingValue::Value(json!("")))
        .build()
        .unwrap();
    let ctx = filled.validate(json!({"name": "Ann"})).unwrap();
    assert_eq!(
        ctx.to_record().unwrap(),
        json!({"id": "", "name": "Ann", "pwd": "", "contact": "", "pwd_hash": ""})
    );
    assert_eq!(ctx.value(&name), Some(json!("Ann")));
}

#[test]
fn map_failure_names_the_record() {
    let f = fixture();
    let err = f
        .user_validator
        .map::<User>(json!({"name": "Ann"}))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeCoercion);
    assert!(err.message.starts_with("cannot build User from validated data"));
}

// ============================================================================
// DEFAULTS
// ============================================================================

#[test]
fn default_applies_when_absent() {
    let f = fixture();
    let mut data = dataset();
    data.as_object_mut().unwrap().remove("name");

    let user: User = f.create_user.map(data).unwrap();
    assert_eq!(user.name, "John Doe");
}

#[test]
fn input_overrides_default() {
    let f = fixture();
    let data = f.create_user.validation_results(dataset()).unwrap();
    assert_eq!(data["name"], json!("User 1"));
}

#[test]
fn explicit_null_is_absent() {
    let f = fixture();
    let mut data = dataset();
    data["name"] = Value::Null;

    let with_null = f.create_user.validation_results(data).unwrap();
    assert_eq!(with_null["name"], json!("John Doe"));

    let data = f
        .user_validator
        .validation_results(json!({"name": null, "pwd": "x"}))
        .unwrap();
    assert!(!data.contains_key("name"));
}

#[test]
fn context_defaults_overlay_configuration() {
    let f = fixture();
    let pwd = f.field("pwd");
    let mut data = dataset();
    data.as_object_mut().unwrap().remove("pwd");

    let mut ctx = f.create_user.context();
    ctx.with_defaults([(pwd.clone(), json!("qwerqwer"))])
        .unwrap()
        .validate(data)
        .unwrap();
    assert_eq!(ctx.value(&pwd), Some(json!("qwerqwer")));

    // the validator itself is untouched
    assert!(f.create_user.config().default_for(&pwd).is_none());
}

#[test]
fn context_defaults_reject_foreign_fields() {
    let f = fixture();
    let number = f.phone.field("number").unwrap();
    let mut ctx = f.create_user.context();
    let err = ctx.with_defaults([(number, json!("1"))]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

// ============================================================================
// READONLY / UNEXPECTED
// ============================================================================

#[test]
fn readonly_input_raises_when_configured() {
    let f = fixture();
    let mut data = dataset();
    data["id"] = json!(5);

    let err = f.create_user.validate(data).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadonlyViolation);
    assert_eq!(err.to_string(), "id: field `id` is readonly");
    assert_eq!(err.field_path(), "id");
}

#[test]
fn nested_readonly_violation_has_field_path() {
    let f = fixture();
    let phone_id = f.phone.field("id").unwrap();
    let locked_phone = Validator::derive(&f.phone_validator, "LockedPhoneValidator")
        .readonly([&phone_id])
        .raise_on_readonly(true)
        .build()
        .unwrap();
    let locked_user = Validator::derive(&f.create_user, "LockedContactValidator")
        .delegate(&f.field("contact"), &locked_phone)
        .build()
        .unwrap();

    let err = locked_user.validate(dataset()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadonlyViolation);
    assert_eq!(err.field_path(), "contact.id");
    assert_eq!(err.to_string(), "contact -> id: field `id` is readonly");
}

#[test]
fn readonly_input_is_dropped_otherwise() {
    let f = fixture();
    let id = f.field("id");
    let update = Validator::derive(&f.user_validator, "UpdateUserValidator")
        .readonly([&id])
        .build()
        .unwrap();

    let data = update
        .validation_results(json!({"id": 5, "name": "Ann"}))
        .unwrap();
    assert_eq!(Value::Object(data), json!({"name": "Ann"}));
}

#[test]
fn dropped_readonly_input_takes_no_default() {
    let f = fixture();
    let id = f.field("id");
    let update = Validator::derive(&f.user_validator, "UpdateUserValidator")
        .readonly([&id])
        .default_value(&id, 0)
        .build()
        .unwrap();

    let data = update.validation_results(json!({"id": 5})).unwrap();
    assert!(!data.contains_key("id"));
}

#[test]
fn readonly_fields_ignore_defaults() {
    let f = fixture();
    let id = f.field("id");
    let strict = Validator::derive(&f.create_user, "StrictValidator")
        .default_value(&id, 1)
        .build()
        .unwrap();

    let data = strict.validation_results(dataset()).unwrap();
    assert!(!data.contains_key("id"));

    let mut ctx = f.create_user.context();
    ctx.with_defaults([(id.clone(), json!(2))])
        .unwrap()
        .validate(dataset())
        .unwrap();
    assert!(!ctx.contains(&id));

    // the export validates again under the same policy
    assert!(strict.validate(data).is_ok());
}

#[test]
fn unexpected_keys_ignored_by_default() {
    let f = fixture();
    let mut data = dataset();
    data["nickname"] = json!("u1");

    let ctx = f.create_user.validate(data).unwrap();
    assert_eq!(ctx.unexpected_keys(), ["nickname".to_owned()]);
    assert!(!ctx.export().unwrap().contains_key("nickname"));
}

#[test]
fn unexpected_keys_raise_when_configured() {
    let f = fixture();
    let strict = Validator::derive(&f.create_user, "StrictValidator")
        .raise_on_unexpected(true)
        .build()
        .unwrap();
    let mut data = dataset();
    data["nickname"] = json!("u1");

    let err = strict.validate(data).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnexpectedField);
    assert_eq!(err.param("field"), Some("nickname"));
    assert_eq!(err.field_path(), "nickname");
}

// ============================================================================
// REQUIREMENTS
// ============================================================================

#[test]
fn requirement_failure_reports_the_rule() {
    let f = fixture();
    let err = f.create_user.validate(json!({"pwd": "x"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequirementUnmet);
    assert_eq!(err.to_string(), "Required fields: (name AND pwd AND contact)");
    assert_eq!(err.param("rule"), Some("(name AND pwd AND contact)"));
}

#[test]
fn session_can_waive_the_requirement() {
    let f = fixture();
    let data = f
        .create_user
        .session(|ctx| {
            ctx.without_requirement()?.validate(json!({"pwd": "x"}))?;
            ctx.export()
        })
        .unwrap();
    assert_eq!(Value::Object(data), json!({"name": "John Doe", "pwd": "x"}));
}

#[test]
fn context_requirement_overlay_replaces_the_rule() {
    let f = fixture();
    let pwd = f.field("pwd");
    let contact = f.field("contact");

    let mut ctx = f.create_user.context();
    ctx.with_requirement(&pwd)
        .unwrap()
        .validate(json!({"pwd": "x"}))
        .unwrap();
    assert_eq!(
        Value::Object(ctx.export().unwrap()),
        json!({"name": "John Doe", "pwd": "x"})
    );

    let mut ctx = f.create_user.context();
    let err = ctx
        .with_requirement(Rule::from(&pwd) | &contact)
        .unwrap()
        .validate(json!({"name": "Ann"}))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequirementUnmet);
    assert_eq!(err.param("rule"), Some("(pwd OR contact)"));

    // the validator's own rule is untouched
    assert_eq!(
        f.create_user.config().requirement().to_string(),
        "(name AND pwd AND contact)"
    );
}

#[test]
fn context_requirement_overlay_rejects_foreign_fields() {
    let f = fixture();
    let number = f.phone.field("number").unwrap();
    let mut ctx = f.create_user.context();
    let err = ctx.with_requirement(&number).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(ctx.stage(), Stage::Created);

    ctx.enumerate(dataset()).unwrap();
    let err = ctx.with_requirement(&f.field("pwd")).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Pipeline);
}

#[test]
fn session_returns_errors_from_the_closure() {
    let f = fixture();
    let err = f
        .create_user
        .session(|ctx| ctx.validate(json!({})).map(|_| ()))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequirementUnmet);
}

// ============================================================================
// RESOLUTION ERRORS
// ============================================================================

#[test]
fn nested_requirement_failure_has_field_path() {
    let f = fixture();
    let mut data = dataset();
    data["contact"] = json!({"id": 1});

    let err = f.create_user.validate(data).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequirementUnmet);
    assert_eq!(err.to_string(), "contact -> number: Field number required");
    assert_eq!(err.field_path(), "contact.number");
}

#[test]
fn field_function_rejection_keeps_its_kind() {
    let f = fixture();
    let mut data = dataset();
    data["contact"]["number"] = json!("abc");

    let err = f.create_user.validate(data).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(
        err.to_string(),
        r#"contact -> number: invalid phone number "abc""#
    );
}

#[test]
fn other_user_errors_are_unexpected() {
    let f = fixture();
    let mut data = dataset();
    data["contact"]["id"] = json!("x1");

    let err = f.create_user.validate(data).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unexpected);
    assert_eq!(
        err.to_string(),
        r#"contact -> id: unexpected error with value "x1": invalid digit found in string"#
    );
}

#[test]
fn primitive_cast_failure_names_field_and_type() {
    let f = fixture();
    let err = f
        .user_validator
        .validate(json!({"id": "seven"}))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::TypeCoercion);
    assert_eq!(err.to_string(), r#"id: cannot cast "seven" to int"#);
}

#[test]
fn record_field_rejects_non_mappings() {
    let f = fixture();
    let err = f
        .user_validator
        .validate(json!({"contact": "+79996465214"}))
        .unwrap_err();
    assert_eq!(err.to_string(), r#"contact: cannot cast "+79996465214" to Phone"#);
}

// ============================================================================
// COMBINATORS
// ============================================================================

#[test]
fn combinator_accepts_consistent_values() {
    let f = fixture();
    let data = f
        .user_validator
        .validation_results(json!({
            "name": "Ann",
            "pwd": "secret",
            "pwd_hash": pwd_hash("secret", "Ann"),
        }))
        .unwrap();
    assert_eq!(data["pwd_hash"], json!("Ann:6"));
}

#[test]
fn combinator_failure_is_reported_unwrapped() {
    let f = fixture();
    let err = f
        .user_validator
        .validate(json!({"name": "Ann", "pwd": "secret", "pwd_hash": "nope"}))
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.to_string(), "Wrong username or password");
}

#[test]
fn combinator_skipped_when_a_field_is_absent() {
    let f = fixture();
    let ctx = f
        .user_validator
        .validate(json!({"name": "Ann", "pwd_hash": "nope"}))
        .unwrap();
    assert!(ctx.is_complete());
}

#[test]
fn combinator_sees_normalized_values() {
    let f = fixture();
    let name = f.field("name");
    let id = f.field("id");
    let validator = Validator::derive(&f.user_validator, "TrimmedValidator")
        .custom(&name, |v| Ok(json!(v.as_str().unwrap_or_default().trim())))
        .combine("name_not_id", [&name, &id], |values| {
            if values[0] == &json!("Ann") && values[1] == &json!(7) {
                Ok(())
            } else {
                Err(ValidationError::custom(format!("unexpected {values:?}")).into())
            }
        })
        .build()
        .unwrap();

    assert!(validator.validate(json!({"name": "  Ann ", "id": "7"})).is_ok());
}

// ============================================================================
// STAGES
// ============================================================================

#[test]
fn stages_can_be_driven_one_by_one() {
    let f = fixture();
    let mut ctx = f.create_user.context();

    ctx.enumerate(dataset()).unwrap().filter().unwrap();
    assert_eq!(ctx.stage(), Stage::Filtered);
    assert_eq!(ctx.filtered().len(), 3);

    ctx.check_requirements().unwrap().normalize().unwrap().combine().unwrap();
    assert!(ctx.is_complete());

    let contact = ctx.get(&f.field("contact")).unwrap();
    let nested = contact.as_record().unwrap();
    assert_eq!(nested.validator().name(), "PhoneValidator");
    assert!(nested.is_complete());
}

#[test]
fn stage_after_failure_is_rejected() {
    let f = fixture();
    let mut ctx = f.create_user.context();
    ctx.enumerate(json!({"id": 1})).unwrap();
    assert!(ctx.filter().is_err());

    let err = ctx.check_requirements().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Pipeline);
    assert_eq!(ctx.stage(), Stage::Failed);
}

#[test]
fn identifier_keyed_input_is_accepted() {
    let f = fixture();
    let raw = RawInput::new()
        .with_field(&f.field("pwd"), "secret")
        .with_name("contact", json!({"number": "12345"}));

    let data = f.create_user.validation_results(raw).unwrap();
    assert_eq!(
        Value::Object(data),
        json!({"name": "John Doe", "pwd": "secret", "contact": {"number": "12345"}})
    );
}

#[test]
fn stages_accept_caller_supplied_data() {
    let f = fixture();
    let [name, pwd, contact] = ["name", "pwd", "contact"].map(|n| f.field(n));
    let mut ctx = f.create_user.context();

    ctx.enumerate(json!({"nickname": "u1"})).unwrap();
    ctx.filter_with([
        (name.clone(), json!("Ann")),
        (pwd.clone(), json!(null)),
        (contact.clone(), json!({"number": "12345"})),
    ])
    .unwrap();
    assert_eq!(ctx.filtered().len(), 2);
    assert!(ctx.unexpected_keys().is_empty());

    ctx.check_requirements_with([name.clone(), pwd.clone(), contact])
        .unwrap();
    ctx.normalize_with([(name, json!("Bob")), (pwd, json!(42))])
        .unwrap()
        .combine()
        .unwrap();
    assert_eq!(
        Value::Object(ctx.export().unwrap()),
        json!({"name": "Bob", "pwd": "42"})
    );
}

#[test]
fn caller_supplied_data_goes_through_the_same_checks() {
    let f = fixture();
    let [id, name] = ["id", "name"].map(|n| f.field(n));

    let mut ctx = f.create_user.context();
    ctx.enumerate(dataset()).unwrap();
    let err = ctx.filter_with([(id, json!(1))]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::ReadonlyViolation);
    assert_eq!(ctx.stage(), Stage::Failed);

    let mut ctx = f.create_user.context();
    ctx.enumerate(dataset()).unwrap().filter().unwrap();
    let err = ctx.check_requirements_with([name]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::RequirementUnmet);
    assert_eq!(err.to_string(), "Required fields: (name AND pwd AND contact)");
}

#[test]
fn caller_supplied_data_rejects_foreign_fields() {
    let f = fixture();
    let number = f.phone.field("number").unwrap();
    let mut ctx = f.create_user.context();
    ctx.enumerate(dataset()).unwrap();

    let err = ctx.filter_with([(number.clone(), json!("12345"))]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(ctx.stage(), Stage::Enumerated);

    ctx.filter().unwrap();
    let err = ctx.check_requirements_with([number]).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
    assert_eq!(ctx.stage(), Stage::Filtered);
}
