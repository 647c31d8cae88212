#![allow(dead_code)]

use std::sync::Arc;

use outpost_validator::prelude::*;
use serde::Deserialize;
use serde_json::Value;

pub fn phone_schema() -> Arc<RecordSchema> {
    RecordSchema::builder("Phone")
        .field("id", TypeDesc::Int)
        .field("number", TypeDesc::Str)
        .build()
        .unwrap()
}

pub fn user_schema(phone: &Arc<RecordSchema>) -> Arc<RecordSchema> {
    RecordSchema::builder("User")
        .field("id", TypeDesc::Int)
        .field("name", TypeDesc::Str)
        .field("pwd", TypeDesc::Str)
        .field("contact", TypeDesc::record(phone))
        .field("pwd_hash", TypeDesc::Str)
        .build()
        .unwrap()
}

/// Deterministic stand-in for a password digest.
pub fn pwd_hash(pwd: &str, name: &str) -> String {
    format!("{name}:{}", pwd.len())
}

pub fn normalize_number(value: &Value) -> Result<Value, BoxError> {
    let raw = value
        .as_str()
        .ok_or_else(|| ValidationError::custom("phone number must be text"))?;
    let number: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = number.strip_prefix('+').unwrap_or(&number);
    if digits.len() < 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::custom(format!("invalid phone number {value}")).into());
    }
    Ok(Value::String(number))
}

pub fn parse_id(value: &Value) -> Result<Value, BoxError> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => Ok(Value::from(s.trim().parse::<i64>()?)),
        _ => Err(ValidationError::custom("id must be numeric").into()),
    }
}

pub fn check_pwd_hash(values: &[&Value]) -> Result<(), BoxError> {
    let [pwd, name, hash] = values else {
        return Err("pwd_hash expects three values".into());
    };
    let expected = pwd_hash(
        pwd.as_str().unwrap_or_default(),
        name.as_str().unwrap_or_default(),
    );
    if hash.as_str() != Some(expected.as_str()) {
        return Err(ValidationError::custom("Wrong username or password").into());
    }
    Ok(())
}

pub struct Fixture {
    pub phone: Arc<RecordSchema>,
    pub user: Arc<RecordSchema>,
    pub phone_validator: Arc<Validator>,
    pub user_validator: Arc<Validator>,
    pub create_user: Arc<Validator>,
}

impl Fixture {
    pub fn field(&self, name: &str) -> FieldId {
        self.user.field(name).unwrap()
    }
}

/// Phone, User and the "create user" case derived from it.
pub fn fixture() -> Fixture {
    let phone = phone_schema();
    let user = user_schema(&phone);

    let phone_id = phone.field("id").unwrap();
    let number = phone.field("number").unwrap();
    let phone_validator = Validator::builder("PhoneValidator", &phone)
        .require(Rule::from(&number))
        .custom(&number, normalize_number)
        .validator(&phone_id, FieldValidator::custom(parse_id).unchecked())
        .build()
        .unwrap();

    let [id, name, pwd, contact, hash] = ["id", "name", "pwd", "contact", "pwd_hash"]
        .map(|field| user.field(field).unwrap());

    let user_validator = Validator::builder("UserValidator", &user)
        .delegate(&contact, &phone_validator)
        .combine("pwd_hash", [&pwd, &name, &hash], check_pwd_hash)
        .build()
        .unwrap();

    let create_user = Validator::derive(&user_validator, "CreateUserValidator")
        .default_value(&name, "John Doe")
        .readonly([&id, &hash])
        .raise_on_readonly(true)
        .require(Rule::from(&name) & &pwd & &contact)
        .build()
        .unwrap();

    Fixture {
        phone,
        user,
        phone_validator,
        user_validator,
        create_user,
    }
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct Phone {
    pub id: Option<i64>,
    pub number: String,
}

#[derive(Debug, PartialEq, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
    pub pwd: String,
    pub contact: Phone,
    pub pwd_hash: Option<String>,
}
