//! Form validation. Everything here runs before a request is built; a form
//! that fails validation never reaches the gateway.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{NewClaim, Role};
use crate::session::Session;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").expect("Invalid regex"));
static SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).expect("Invalid regex"));
static COUNTRY_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+[0-9]{1,4}$").expect("Invalid regex"));
static POLICY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^POL-[0-9]{1,8}$").expect("Invalid regex"));

const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 6..=11;
const AADHAR_DIGITS: usize = 12;
const MIN_PASSWORD_STRENGTH: u8 = 3;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Password is too weak ({0}). Use at least 8 characters mixing upper and lower case letters, digits and symbols.")]
    WeakPassword(StrengthLabel),

    #[error("Country code must be '+' followed by up to 4 digits")]
    InvalidCountryCode,

    #[error("Phone number must contain 6 to 11 digits")]
    InvalidPhone,

    #[error("Aadhar number must be exactly 12 digits")]
    InvalidAadhar,

    #[error("Policy number must be POL- followed by up to 8 digits")]
    InvalidPolicyNumber,

    #[error("Please select a valid claim type")]
    InvalidClaimType,

    #[error("Amount must be a non-negative number")]
    InvalidAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StrengthLabel {
    Weak,
    Fair,
    Good,
    Strong,
}

impl fmt::Display for StrengthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrengthLabel::Weak => "Weak",
            StrengthLabel::Fair => "Fair",
            StrengthLabel::Good => "Good",
            StrengthLabel::Strong => "Strong",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PasswordChecks {
    pub min_length: bool,
    pub has_upper: bool,
    pub has_lower: bool,
    pub has_number: bool,
    pub has_special: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordStrength {
    pub score: u8,
    pub checks: PasswordChecks,
}

impl PasswordStrength {
    pub fn label(&self) -> StrengthLabel {
        match self.score {
            0..=2 => StrengthLabel::Weak,
            3 => StrengthLabel::Fair,
            4 => StrengthLabel::Good,
            _ => StrengthLabel::Strong,
        }
    }

    pub fn is_acceptable(&self) -> bool {
        self.score >= MIN_PASSWORD_STRENGTH
    }
}

pub fn password_strength(password: &str) -> PasswordStrength {
    let checks = PasswordChecks {
        min_length: password.chars().count() >= 8,
        has_upper: password.chars().any(|c| c.is_ascii_uppercase()),
        has_lower: password.chars().any(|c| c.is_ascii_lowercase()),
        has_number: password.chars().any(|c| c.is_ascii_digit()),
        has_special: SPECIAL.is_match(password),
    };
    let score = [
        checks.min_length,
        checks.has_upper,
        checks.has_lower,
        checks.has_number,
        checks.has_special,
    ]
    .into_iter()
    .filter(|passed| *passed)
    .count() as u8;
    PasswordStrength { score, checks }
}

/// Aadhar digits grouped in fours: `1234 5678 9012`.
pub fn format_aadhar(digits: &str) -> String {
    let cleaned: Vec<char> = digits.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned
        .chunks(4)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

/// Registration form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
    pub country_code: String,
    pub phone_number: String,
    pub aadhar_number: String,
}

/// Body of `POST /auth/register`; only produced by a validated form.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone_number: String,
    pub aadhar_number: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        let name = required("Name", &self.name)?;

        let email = required("Email", &self.email)?;
        if !EMAIL.is_match(&email) {
            return Err(ValidationError::InvalidEmail);
        }

        if self.password.is_empty() {
            return Err(ValidationError::Required("Password"));
        }
        let strength = password_strength(&self.password);
        if !strength.is_acceptable() {
            return Err(ValidationError::WeakPassword(strength.label()));
        }

        let country_code = self.country_code.trim();
        if !COUNTRY_CODE.is_match(country_code) {
            return Err(ValidationError::InvalidCountryCode);
        }
        let phone = required("Phone number", &self.phone_number)?;
        if phone.chars().any(|c| !(c.is_ascii_digit() || c == ' ' || c == '-')) {
            return Err(ValidationError::InvalidPhone);
        }
        let phone_digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if !PHONE_DIGITS.contains(&phone_digits.len()) {
            return Err(ValidationError::InvalidPhone);
        }

        let aadhar: String = self
            .aadhar_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if aadhar.len() != AADHAR_DIGITS || !aadhar.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidAadhar);
        }

        Ok(Registration {
            name,
            email,
            password: self.password.clone(),
            role: self.role.unwrap_or(Role::Customer),
            phone_number: format!("{country_code}{phone_digits}"),
            aadhar_number: aadhar,
        })
    }
}

/// New-claim form as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimForm {
    pub policy_number: String,
    pub claim_type_id: String,
    pub amount: String,
    pub description: String,
}

impl ClaimForm {
    /// Empty form with the policy number taken from the signed-in customer.
    pub fn for_session(session: &Session) -> Self {
        Self {
            policy_number: session.policy_number.clone().unwrap_or_default(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<NewClaim, ValidationError> {
        let policy_number = required("Policy number", &self.policy_number)?.to_ascii_uppercase();
        if !POLICY_NUMBER.is_match(&policy_number) {
            return Err(ValidationError::InvalidPolicyNumber);
        }

        let claim_type_id = required("Claim type", &self.claim_type_id)?
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(ValidationError::InvalidClaimType)?;

        let amount = required("Amount", &self.amount)?
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite() && *amount >= 0.0)
            .ok_or(ValidationError::InvalidAmount)?;

        let description = required("Description", &self.description)?;

        Ok(NewClaim {
            policy_number,
            claim_type_id,
            amount,
            description,
        })
    }
}
