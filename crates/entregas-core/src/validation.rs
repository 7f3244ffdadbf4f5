//! Client-side form validation and input masks.
//!
//! Field keys are the backend's field names, so server-side `details` and
//! local errors land on the same form field.

use chrono::NaiveDate;
use entregas_types::records::EXPENSE_KINDS;
use serde::Serialize;
use serde_json::{Value, json};

pub const CODE_LEN: usize = 6;
pub const MIN_PASSWORD_LEN: usize = 8;

/// Ordered field → message map. The first message recorded for a field wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        if self.get(&field).is_none() {
            self.0.push((field, message.into()));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(f, m)| (f.as_str(), m.as_str()))
    }

    /// First message, for a single-line banner.
    pub fn first_message(&self) -> Option<&str> {
        self.0.first().map(|(_, m)| m.as_str())
    }

    fn check(&mut self, field: &str, result: Result<(), &'static str>) {
        if let Err(message) = result {
            self.insert(field, message);
        }
    }
}

fn only_digits(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    const INVALID: &str = "Invalid email address";

    let email = email.trim();
    if email.is_empty() {
        return Err("Email is required");
    }
    if email.chars().any(char::is_whitespace) {
        return Err(INVALID);
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(INVALID);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(INVALID);
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(INVALID);
    }
    Ok(())
}

/// Formats a Brazilian phone number: 10 digits → `(DD) DDDD-DDDD`,
/// 11 digits → `(DD) DDDDD-DDDD`. Non-digits are ignored.
pub fn format_phone(input: &str) -> Result<String, &'static str> {
    let digits = only_digits(input);
    match digits.len() {
        10 => Ok(format!(
            "({}) {}-{}",
            &digits[..2],
            &digits[2..6],
            &digits[6..]
        )),
        11 => Ok(format!(
            "({}) {}-{}",
            &digits[..2],
            &digits[2..7],
            &digits[7..]
        )),
        _ => Err("Phone must have 10 or 11 digits"),
    }
}

/// Progressive CPF mask (`DDD.DDD.DDD-DD`) over at most 11 digits.
pub fn mask_cpf(input: &str) -> String {
    let digits: String = only_digits(input).chars().take(11).collect();
    let mut out = String::with_capacity(14);
    for (i, c) in digits.chars().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Accepts exactly 11 digits whose mask is a complete `DDD.DDD.DDD-DD`.
pub fn validate_cpf(input: &str) -> Result<String, &'static str> {
    let masked = mask_cpf(input);
    if only_digits(input).len() == 11 && matches_pattern(&masked, "DDD.DDD.DDD-DD") {
        Ok(masked)
    } else {
        Err("CPF must have 11 digits")
    }
}

/// Progressive CEP mask (`DDDDD-DDD`) over at most 8 digits.
pub fn mask_cep(input: &str) -> String {
    let digits: String = only_digits(input).chars().take(8).collect();
    let mut out = String::with_capacity(9);
    for (i, c) in digits.chars().enumerate() {
        if i == 5 {
            out.push('-');
        }
        out.push(c);
    }
    out
}

/// Accepts exactly 8 digits.
pub fn validate_cep(input: &str) -> Result<String, &'static str> {
    let masked = mask_cep(input);
    if only_digits(input).len() == 8 && matches_pattern(&masked, "DDDDD-DDD") {
        Ok(masked)
    } else {
        Err("CEP must have 8 digits")
    }
}

/// `D` matches an ASCII digit; every other pattern char matches itself.
fn matches_pattern(value: &str, pattern: &str) -> bool {
    value.len() == pattern.len()
        && value.chars().zip(pattern.chars()).all(|(v, p)| match p {
            'D' => v.is_ascii_digit(),
            other => v == other,
        })
}

/// Verification codes are exactly six ASCII digits.
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    let code = code.trim();
    if code.len() == CODE_LEN && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err("Code must have 6 digits")
    }
}

pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must have at least 8 characters");
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err("Username must have 3 to 20 characters");
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username may only contain letters, digits and _");
    }
    Ok(())
}

fn validate_time(value: &str) -> Result<(), &'static str> {
    chrono::NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .ok()
        .map(|_| ())
        .ok_or("Time must be HH:MM")
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.check("email", validate_email(&self.email));
        if self.password.is_empty() {
            errors.insert("password", "Password is required");
        }
        errors
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub cpf: Option<String>,
    pub password: String,
    pub password_confirm: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.name.trim().chars().count() < 2 {
            errors.insert("nome", "Name must have at least 2 characters");
        }
        errors.check("username", validate_username(self.username.trim()));
        errors.check("email", validate_email(&self.email));
        errors.check("telefone", format_phone(&self.phone).map(|_| ()));
        if let Some(cpf) = self.cpf.as_deref().filter(|c| !c.trim().is_empty()) {
            errors.check("cpf", validate_cpf(cpf).map(|_| ()));
        }
        errors.check("password", validate_password(&self.password));
        if self.password != self.password_confirm {
            errors.insert("password_confirm", "Passwords do not match");
        }
        errors
    }

    /// Request body with masks applied. Call after [`Self::validate`].
    pub fn to_payload(&self) -> Value {
        let mut body = json!({
            "nome": self.name.trim(),
            "username": self.username.trim(),
            "email": self.email.trim(),
            "telefone": format_phone(&self.phone).unwrap_or_else(|_| self.phone.clone()),
            "password": self.password,
            "password_confirm": self.password_confirm,
        });
        if let Some(cpf) = self.cpf.as_deref().filter(|c| !c.trim().is_empty()) {
            body["cpf"] = Value::String(mask_cpf(cpf));
        }
        body
    }
}

#[derive(Debug, Clone, Default)]
pub struct PasswordChangeForm {
    pub current_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

impl PasswordChangeForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.current_password.is_empty() {
            errors.insert("current_password", "Current password is required");
        }
        errors.check("new_password", validate_password(&self.new_password));
        if self.new_password != self.new_password_confirm {
            errors.insert("new_password_confirm", "Passwords do not match");
        }
        errors
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "current_password": self.current_password,
            "new_password": self.new_password,
            "new_password_confirm": self.new_password_confirm,
        })
    }
}

/// Profile edit; only `Some` fields are sent.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub cpf: Option<String>,
    pub cep: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

impl ProfileForm {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.phone.is_none()
            && self.cpf.is_none()
            && self.cep.is_none()
            && self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
    }

    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            if name.trim().chars().count() < 2 {
                errors.insert("nome", "Name must have at least 2 characters");
            }
        }
        if let Some(phone) = &self.phone {
            errors.check("telefone", format_phone(phone).map(|_| ()));
        }
        if let Some(cpf) = &self.cpf {
            errors.check("cpf", validate_cpf(cpf).map(|_| ()));
        }
        if let Some(cep) = &self.cep {
            errors.check("cep", validate_cep(cep).map(|_| ()));
        }
        if let Some(state) = &self.state {
            let state = state.trim();
            if state.len() != 2 || !state.chars().all(|c| c.is_ascii_alphabetic()) {
                errors.insert("estado", "State must be a 2-letter code");
            }
        }
        errors
    }

    pub fn to_payload(&self) -> Value {
        let mut body = serde_json::Map::new();
        if let Some(name) = &self.name {
            body.insert("nome".into(), name.trim().into());
        }
        if let Some(phone) = &self.phone {
            body.insert(
                "telefone".into(),
                format_phone(phone).unwrap_or_else(|_| phone.clone()).into(),
            );
        }
        if let Some(cpf) = &self.cpf {
            body.insert("cpf".into(), mask_cpf(cpf).into());
        }
        if let Some(cep) = &self.cep {
            body.insert("cep".into(), mask_cep(cep).into());
        }
        if let Some(address) = &self.address {
            body.insert("endereco".into(), address.trim().into());
        }
        if let Some(city) = &self.city {
            body.insert("cidade".into(), city.trim().into());
        }
        if let Some(state) = &self.state {
            body.insert("estado".into(), state.trim().to_ascii_uppercase().into());
        }
        Value::Object(body)
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkRecordForm {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub delivered: u32,
    pub not_delivered: u32,
    pub payment_type: String,
    pub value: f64,
}

impl WorkRecordForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            errors.insert("data", "Date must be YYYY-MM-DD");
        }
        errors.check("hora_inicio", validate_time(&self.start_time));
        errors.check("hora_fim", validate_time(&self.end_time));
        if self.payment_type.trim().is_empty() {
            errors.insert("tipo_pagamento", "Payment type is required");
        }
        if !self.value.is_finite() || self.value < 0.0 {
            errors.insert("valor", "Value must be zero or more");
        }
        errors
    }

    pub fn to_payload(&self) -> Value {
        json!({
            "data": self.date.trim(),
            "hora_inicio": self.start_time.trim(),
            "hora_fim": self.end_time.trim(),
            "quantidade_entregues": self.delivered,
            "quantidade_nao_entregues": self.not_delivered,
            "tipo_pagamento": self.payment_type.trim(),
            "valor": format!("{:.2}", self.value),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExpenseForm {
    pub kind: String,
    pub description: Option<String>,
    pub value: f64,
    pub date: String,
}

impl ExpenseForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        let kind = self.kind.trim();
        if kind.is_empty() {
            errors.insert("tipo_despesa", "Expense type is required");
        } else if !EXPENSE_KINDS.contains(&kind) {
            errors.insert("tipo_despesa", "Unknown expense type");
        }
        if kind == "outros" && self.description.as_deref().is_none_or(|d| d.trim().is_empty()) {
            errors.insert("descricao", "Describe the expense");
        }
        if !self.value.is_finite() || self.value <= 0.0 {
            errors.insert("valor", "Value must be greater than zero");
        }
        if NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").is_err() {
            errors.insert("data", "Date must be YYYY-MM-DD");
        }
        errors
    }

    pub fn to_payload(&self) -> Value {
        let mut body = json!({
            "tipo_despesa": self.kind.trim(),
            "valor": format!("{:.2}", self.value),
            "data": self.date.trim(),
        });
        if let Some(description) = self.description.as_deref().filter(|d| !d.trim().is_empty()) {
            body["descricao"] = Value::String(description.trim().to_string());
        }
        body
    }
}

#[derive(Debug, Clone, Default)]
pub struct VehicleForm {
    pub kind: String,
    pub model: String,
    pub plate: Option<String>,
    pub category: Option<String>,
    pub km_per_liter: f64,
}

impl VehicleForm {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if entregas_types::VehicleKind::parse(&self.kind).is_none() {
            errors.insert("tipo", "Type must be carro or moto");
        }
        if self.model.trim().is_empty() {
            errors.insert("modelo", "Model is required");
        }
        if !self.km_per_liter.is_finite() || self.km_per_liter < 0.0 {
            errors.insert("km_por_l", "Km per liter must be zero or more");
        }
        errors
    }

    pub fn to_payload(&self) -> Value {
        let kind = entregas_types::VehicleKind::parse(&self.kind).unwrap_or_default();
        let mut body = json!({
            "tipo": kind.as_str(),
            "modelo": self.model.trim(),
            "km_por_l": format!("{:.2}", self.km_per_liter),
        });
        if let Some(plate) = self.plate.as_deref().filter(|p| !p.trim().is_empty()) {
            body["placa"] = Value::String(plate.trim().to_ascii_uppercase());
        }
        if let Some(category) = self.category.as_deref().filter(|c| !c.trim().is_empty()) {
            body["categoria"] = Value::String(category.trim().to_string());
        }
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_emails_rejected() {
        for email in [
            "",
            "user.example.com",
            "@example.com",
            "user@",
            "user@example",
            "user@example.",
            "user@.com",
            "us er@example.com",
            "a@b@c.com",
        ] {
            assert!(validate_email(email).is_err(), "accepted {email:?}");
        }
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email(" joao.silva@mail.com.br ").is_ok());
    }

    #[test]
    fn test_format_phone_by_digit_count() {
        assert_eq!(format_phone("1133334444").unwrap(), "(11) 3333-4444");
        assert_eq!(format_phone("11988887777").unwrap(), "(11) 98888-7777");
        assert_eq!(format_phone("(11) 98888-7777").unwrap(), "(11) 98888-7777");
        for bad in ["", "123", "113333444", "119888877770"] {
            assert!(format_phone(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_cpf_mask_and_validation() {
        assert_eq!(mask_cpf("1234"), "123.4");
        assert_eq!(mask_cpf("12345678901999"), "123.456.789-01");
        assert_eq!(validate_cpf("12345678901").unwrap(), "123.456.789-01");
        assert_eq!(validate_cpf("123.456.789-01").unwrap(), "123.456.789-01");
        assert!(validate_cpf("abc").is_err());
        for bad in ["1234567890", "123456789012", "123.456.789-012"] {
            assert!(validate_cpf(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_cep_mask_and_validation() {
        assert_eq!(mask_cep("01310"), "01310");
        assert_eq!(mask_cep("01310100"), "01310-100");
        assert!(validate_cep("01310-100").is_ok());
        for bad in ["0131010", "013101000", "01310-1000"] {
            assert!(validate_cep(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_code_must_be_six_digits() {
        assert!(validate_code("123456").is_ok());
        assert!(validate_code("12345").is_err());
        assert!(validate_code("1234567").is_err());
        assert!(validate_code("12a456").is_err());
        assert!(validate_code("١٢٣٤٥٦").is_err());
    }

    #[test]
    fn test_login_form() {
        let ok = LoginForm {
            email: "user@example.com".into(),
            password: "hunter22".into(),
        };
        assert!(ok.validate().is_empty());

        let bad = LoginForm {
            email: "nope".into(),
            password: String::new(),
        };
        let errors = bad.validate();
        assert!(errors.get("email").is_some());
        assert!(errors.get("password").is_some());
    }

    fn registration() -> RegistrationForm {
        RegistrationForm {
            name: "Ana Souza".into(),
            username: "ana_souza".into(),
            email: "ana@example.com".into(),
            phone: "11988887777".into(),
            cpf: None,
            password: "segredo123".into(),
            password_confirm: "segredo123".into(),
        }
    }

    #[test]
    fn test_registration_form_valid() {
        let form = registration();
        assert!(form.validate().is_empty());
        let body = form.to_payload();
        assert_eq!(body["telefone"], "(11) 98888-7777");
        assert_eq!(body["nome"], "Ana Souza");
        assert!(body.get("cpf").is_none());
    }

    #[test]
    fn test_registration_form_rules() {
        let form = RegistrationForm {
            name: "A".into(),
            username: "an".into(),
            password: "short".into(),
            password_confirm: "other".into(),
            cpf: Some("123".into()),
            ..registration()
        };
        let errors = form.validate();
        assert!(errors.get("nome").is_some());
        assert!(errors.get("username").is_some());
        assert!(errors.get("password").is_some());
        assert_eq!(errors.get("password_confirm"), Some("Passwords do not match"));
        assert!(errors.get("cpf").is_some());

        let bad_chars = RegistrationForm {
            username: "ana-souza".into(),
            ..registration()
        };
        assert!(bad_chars.validate().get("username").is_some());
    }

    #[test]
    fn test_field_errors_keep_first_message_and_order() {
        let mut errors = FieldErrors::new();
        errors.insert("email", "first");
        errors.insert("password", "p");
        errors.insert("email", "second");
        assert_eq!(errors.get("email"), Some("first"));
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.first_message(), Some("first"));
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn test_work_record_form() {
        let form = WorkRecordForm {
            date: "2024-03-10".into(),
            start_time: "08:00".into(),
            end_time: "18:30".into(),
            delivered: 40,
            not_delivered: 2,
            payment_type: "diaria".into(),
            value: 180.0,
        };
        assert!(form.validate().is_empty());
        assert_eq!(form.to_payload()["valor"], "180.00");

        let bad = WorkRecordForm {
            date: "10/03/2024".into(),
            start_time: "8h".into(),
            value: -1.0,
            ..form
        };
        let errors = bad.validate();
        assert!(errors.get("data").is_some());
        assert!(errors.get("hora_inicio").is_some());
        assert!(errors.get("valor").is_some());
    }

    #[test]
    fn test_expense_form() {
        let form = ExpenseForm {
            kind: "combustivel".into(),
            description: None,
            value: 50.0,
            date: "2024-03-10".into(),
        };
        assert!(form.validate().is_empty());

        let other = ExpenseForm {
            kind: "outros".into(),
            value: 0.0,
            ..form.clone()
        };
        let errors = other.validate();
        assert!(errors.get("descricao").is_some());
        assert!(errors.get("valor").is_some());

        let unknown = ExpenseForm {
            kind: "lazer".into(),
            ..form
        };
        assert!(unknown.validate().get("tipo_despesa").is_some());
    }

    #[test]
    fn test_vehicle_form() {
        let form = VehicleForm {
            kind: "Moto".into(),
            model: "CG 160".into(),
            plate: Some("abc1d23".into()),
            category: None,
            km_per_liter: 35.0,
        };
        assert!(form.validate().is_empty());
        let body = form.to_payload();
        assert_eq!(body["tipo"], "moto");
        assert_eq!(body["placa"], "ABC1D23");

        let bad = VehicleForm {
            kind: "bike".into(),
            model: " ".into(),
            ..form
        };
        let errors = bad.validate();
        assert!(errors.get("tipo").is_some());
        assert!(errors.get("modelo").is_some());
    }

    #[test]
    fn test_profile_form_masks_present_fields() {
        let form = ProfileForm {
            cep: Some("01310100".into()),
            cpf: Some("12345678901".into()),
            state: Some("sp".into()),
            ..Default::default()
        };
        assert!(form.validate().is_empty());
        let body = form.to_payload();
        assert_eq!(body["cep"], "01310-100");
        assert_eq!(body["cpf"], "123.456.789-01");
        assert_eq!(body["estado"], "SP");
        assert!(body.get("nome").is_none());

        let bad = ProfileForm {
            cep: Some("123".into()),
            ..Default::default()
        };
        assert!(bad.validate().get("cep").is_some());
        assert!(ProfileForm::default().is_empty());
    }

    #[test]
    fn test_password_change_form() {
        let form = PasswordChangeForm {
            current_password: "old-secret".into(),
            new_password: "new-secret".into(),
            new_password_confirm: "different".into(),
        };
        assert!(form.validate().get("new_password_confirm").is_some());
    }
}
