//! User / phone validators: defaults, readonly fields, requirements and a
//! nested delegate.
//!
//! Run with `RUST_LOG=outpost_validator=debug` to see the pipeline stages.

use outpost_validator::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Phone {
    id: Option<i64>,
    number: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct User {
    id: Option<i64>,
    name: String,
    pwd: String,
    contact: Phone,
}

fn normalize_number(value: &Value) -> Result<Value, BoxError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::custom("phone number must be text"))?;
    let number: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    Ok(Value::String(number))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let phone = RecordSchema::builder("Phone")
        .field("id", TypeDesc::Int)
        .field("number", TypeDesc::Str)
        .build()?;
    let user = RecordSchema::builder("User")
        .field("id", TypeDesc::Int)
        .field("name", TypeDesc::Str)
        .field("pwd", TypeDesc::Str)
        .field("contact", TypeDesc::record(&phone))
        .build()?;

    let number = phone.field("number")?;
    let phone_validator = Validator::builder("PhoneValidator", &phone)
        .require(Rule::from(&number))
        .custom(&number, normalize_number)
        .build()?;

    let [id, name, pwd, contact] = ["id", "name", "pwd", "contact"].map(|f| user.field(f));
    let (id, name, pwd, contact) = (id?, name?, pwd?, contact?);

    let mut registry = ValidatorRegistry::new();
    registry.define(Validator::builder("UserValidator", &user).delegate(&contact, &phone_validator))?;
    let create_user = registry
        .derive("UserValidator", "CreateUserValidator")?
        .default_value(&name, "John Doe")
        .readonly([&id])
        .require(Rule::from(&name) & &pwd & &contact);
    let create_user = registry.define(create_user)?;
    println!("{create_user}\n");

    let created: User = create_user.map(json!({
        "pwd": "qwerty",
        "contact": {"number": "+7 999 646-52-14"},
    }))?;
    println!("created: {created:?}");

    let mut ctx = create_user.context();
    ctx.with_defaults([(pwd.clone(), json!("generated"))])?
        .validate(json!({"name": "Ann", "contact": {"number": "12345"}}))?;
    println!("with per-call defaults: {}", Value::Object(ctx.export()?));

    let draft = create_user.session(|ctx| {
        ctx.without_requirement()?.validate(json!({"name": "Draft"}))?;
        ctx.export()
    })?;
    println!("draft without requirements: {}", Value::Object(draft));

    match create_user.validate(json!({"name": "Bob"})) {
        Ok(_) => println!("unexpectedly valid"),
        Err(err) => println!("rejected [{}]: {err}", err.code()),
    }

    Ok(())
}
