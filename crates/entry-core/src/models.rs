//! Traveler record models
//!
//! Three record kinds cover an entry form: [`Passport`], [`PersonalInfo`],
//! and [`FundingProof`]. Each model owns its validation rules and its
//! partial-update semantics; persistence is delegated to the storage
//! engine. Absence of a record is data (`None`), never an error.

use crate::error::{Error, Result};
use crate::kind::RecordKind;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Gender as printed in travel documents
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    /// Male
    Male,
    /// Female
    Female,
    /// Not stated or not recognized
    #[default]
    Undefined,
}

impl Gender {
    /// Stable string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Undefined => "Undefined",
        }
    }

    /// Tolerant parse for legacy data ("M", "male", "F", ...).
    /// Anything unrecognized maps to [`Gender::Undefined`].
    pub fn parse_loose(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "m" | "male" => Gender::Male,
            "f" | "female" => Gender::Female,
            _ => Gender::Undefined,
        }
    }
}

/// Current timestamp in RFC 3339, the format every record stores
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Generate a record id
pub fn generate_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// First recognizable string under any of `keys` in a legacy JSON object.
/// Numbers are accepted and stringified (old forms stored cash as a number).
fn legacy_string(value: &Value, keys: &[&str]) -> Option<String> {
    let object = value.as_object()?;
    for key in keys {
        match object.get(*key) {
            Some(Value::String(s)) if !is_blank(s) => return Some(s.trim().to_string()),
            Some(Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

/// Passport document record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Passport {
    /// Record id
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Passport number as printed
    pub passport_number: String,
    /// Full legal name
    pub full_name: String,
    /// Date of birth, `YYYY-MM-DD`
    pub date_of_birth: String,
    /// Nationality (ISO country code or printed name)
    pub nationality: String,
    /// Gender as printed
    pub gender: Gender,
    /// Issue date, `YYYY-MM-DD`
    pub issue_date: String,
    /// Issuing authority or place
    pub issue_place: String,
    /// Expiry date, `YYYY-MM-DD`
    pub expiry_date: String,
    /// Whether this is the owner's active passport
    pub is_primary: bool,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
    /// Last updated timestamp (RFC 3339)
    pub updated_at: String,
}

impl Default for Passport {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner_id: String::new(),
            passport_number: String::new(),
            full_name: String::new(),
            date_of_birth: String::new(),
            nationality: String::new(),
            gender: Gender::Undefined,
            issue_date: String::new(),
            issue_place: String::new(),
            expiry_date: String::new(),
            is_primary: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }
}

impl Passport {
    /// Create an empty passport for an owner with fresh id and timestamps
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: generate_record_id(),
            owner_id: owner_id.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Self::default()
        }
    }

    /// Build from a legacy key-value payload, normalizing as we go:
    /// owner id and record id injected, gender defaulted, timestamps
    /// stamped. Returns `None` when the payload carries no recognizable
    /// passport field.
    pub fn from_legacy(value: &Value, owner_id: &str) -> Option<Self> {
        let passport_number = legacy_string(value, &["passportNumber", "passport_number"]);
        let full_name = legacy_string(value, &["fullName", "full_name", "name"]);
        if passport_number.is_none() && full_name.is_none() {
            return None;
        }
        let mut passport = Passport::new(owner_id);
        passport.passport_number = passport_number.unwrap_or_default();
        passport.full_name = full_name.unwrap_or_default();
        passport.date_of_birth =
            legacy_string(value, &["dateOfBirth", "date_of_birth", "dob"]).unwrap_or_default();
        passport.nationality = legacy_string(value, &["nationality"]).unwrap_or_default();
        passport.gender = legacy_string(value, &["gender", "sex"])
            .map(|g| Gender::parse_loose(&g))
            .unwrap_or_default();
        passport.issue_date =
            legacy_string(value, &["issueDate", "issue_date"]).unwrap_or_default();
        passport.issue_place =
            legacy_string(value, &["issuePlace", "issue_place"]).unwrap_or_default();
        passport.expiry_date =
            legacy_string(value, &["expiryDate", "expiry_date"]).unwrap_or_default();
        Some(passport)
    }

    /// Field-level validation messages; empty when the record is valid
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if is_blank(&self.passport_number) {
            errors.push("passport number is required".to_string());
        } else if !self
            .passport_number
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
        {
            errors.push("passport number must be alphanumeric".to_string());
        }

        if is_blank(&self.full_name) {
            errors.push("full name is required".to_string());
        }
        if is_blank(&self.nationality) {
            errors.push("nationality is required".to_string());
        }

        let birth = match parse_date(&self.date_of_birth) {
            Some(d) => Some(d),
            None => {
                errors.push("date of birth must be a valid YYYY-MM-DD date".to_string());
                None
            }
        };
        let issue = match parse_date(&self.issue_date) {
            Some(d) => Some(d),
            None => {
                errors.push("issue date must be a valid YYYY-MM-DD date".to_string());
                None
            }
        };
        let expiry = match parse_date(&self.expiry_date) {
            Some(d) => Some(d),
            None => {
                errors.push("expiry date must be a valid YYYY-MM-DD date".to_string());
                None
            }
        };

        if let Some(birth) = birth {
            if birth > Utc::now().date_naive() {
                errors.push("date of birth cannot be in the future".to_string());
            }
            if let Some(issue) = issue {
                if issue <= birth {
                    errors.push("issue date must be after date of birth".to_string());
                }
            }
        }
        if let (Some(issue), Some(expiry)) = (issue, expiry) {
            if expiry <= issue {
                errors.push("expiry date must be after issue date".to_string());
            }
        }

        errors
    }

    /// Validate, surfacing the field messages as one error
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    /// Content fields as a name→value map, for conflict diffing
    pub fn content_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("passport_number", self.passport_number.clone()),
            ("full_name", self.full_name.clone()),
            ("date_of_birth", self.date_of_birth.clone()),
            ("nationality", self.nationality.clone()),
            ("gender", self.gender.as_str().to_string()),
            ("issue_date", self.issue_date.clone()),
            ("issue_place", self.issue_place.clone()),
            ("expiry_date", self.expiry_date.clone()),
        ])
    }

    /// Refresh the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

/// Partial passport update; every provided field overwrites the stored one
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PassportUpdate {
    /// Passport number
    pub passport_number: Option<String>,
    /// Full legal name
    pub full_name: Option<String>,
    /// Date of birth
    pub date_of_birth: Option<String>,
    /// Nationality
    pub nationality: Option<String>,
    /// Gender
    pub gender: Option<Gender>,
    /// Issue date
    pub issue_date: Option<String>,
    /// Issue place
    pub issue_place: Option<String>,
    /// Expiry date
    pub expiry_date: Option<String>,
    /// Active-passport flag
    pub is_primary: Option<bool>,
}

impl PassportUpdate {
    /// Apply to an existing record. Id and creation timestamp are never
    /// mutated; the update timestamp is refreshed by the caller's save
    /// path via [`Passport::touch`].
    pub fn apply_to(&self, passport: &mut Passport) {
        if let Some(v) = &self.passport_number {
            passport.passport_number = v.clone();
        }
        if let Some(v) = &self.full_name {
            passport.full_name = v.clone();
        }
        if let Some(v) = &self.date_of_birth {
            passport.date_of_birth = v.clone();
        }
        if let Some(v) = &self.nationality {
            passport.nationality = v.clone();
        }
        if let Some(v) = self.gender {
            passport.gender = v;
        }
        if let Some(v) = &self.issue_date {
            passport.issue_date = v.clone();
        }
        if let Some(v) = &self.issue_place {
            passport.issue_place = v.clone();
        }
        if let Some(v) = &self.expiry_date {
            passport.expiry_date = v.clone();
        }
        if let Some(v) = self.is_primary {
            passport.is_primary = v;
        }
    }
}

/// Contact and residence details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    /// Record id
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Phone number
    pub phone_number: String,
    /// Email address
    pub email: String,
    /// Occupation
    pub occupation: String,
    /// City or province of residence
    pub city_of_residence: String,
    /// Country or region of residence
    pub country_of_residence: String,
    /// Home address
    pub home_address: String,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
    /// Last updated timestamp (RFC 3339)
    pub updated_at: String,
}

impl PersonalInfo {
    /// Create an empty record for an owner with fresh id and timestamps
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: generate_record_id(),
            owner_id: owner_id.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Self::default()
        }
    }

    /// Build from a legacy key-value payload; see [`Passport::from_legacy`]
    pub fn from_legacy(value: &Value, owner_id: &str) -> Option<Self> {
        let phone = legacy_string(value, &["phoneNumber", "phone_number", "phone"]);
        let email = legacy_string(value, &["email", "emailAddress"]);
        let address = legacy_string(value, &["homeAddress", "home_address", "address"]);
        if phone.is_none() && email.is_none() && address.is_none() {
            return None;
        }
        let mut info = PersonalInfo::new(owner_id);
        info.phone_number = phone.unwrap_or_default();
        info.email = email.unwrap_or_default();
        info.occupation = legacy_string(value, &["occupation"]).unwrap_or_default();
        info.city_of_residence =
            legacy_string(value, &["cityOfResidence", "city_of_residence", "city"])
                .unwrap_or_default();
        info.country_of_residence = legacy_string(
            value,
            &["countryOfResidence", "country_of_residence", "country"],
        )
        .unwrap_or_default();
        info.home_address = address.unwrap_or_default();
        Some(info)
    }

    /// Field-level validation messages. All fields are optional (forms
    /// are filled progressively); format is checked once a field is set.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !is_blank(&self.email) && !is_valid_email(&self.email) {
            errors.push(format!("invalid email address: {}", self.email));
        }
        if !is_blank(&self.phone_number) && !is_valid_phone(&self.phone_number) {
            errors.push(format!("invalid phone number: {}", self.phone_number));
        }
        errors
    }

    /// Validate, surfacing the field messages as one error
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    /// Content fields as a name→value map, for conflict diffing
    pub fn content_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("phone_number", self.phone_number.clone()),
            ("email", self.email.clone()),
            ("occupation", self.occupation.clone()),
            ("city_of_residence", self.city_of_residence.clone()),
            ("country_of_residence", self.country_of_residence.clone()),
            ("home_address", self.home_address.clone()),
        ])
    }

    /// Refresh the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

/// Partial personal-info update with merge semantics: a missing or
/// blank incoming field never clobbers an existing non-empty value, so
/// screens can submit only the fields they own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfoUpdate {
    /// Phone number
    pub phone_number: Option<String>,
    /// Email address
    pub email: Option<String>,
    /// Occupation
    pub occupation: Option<String>,
    /// City or province of residence
    pub city_of_residence: Option<String>,
    /// Country or region of residence
    pub country_of_residence: Option<String>,
    /// Home address
    pub home_address: Option<String>,
}

impl PersonalInfoUpdate {
    /// Merge into an existing record, skipping blank incoming fields
    pub fn merge_into(&self, info: &mut PersonalInfo) {
        merge_field(&mut info.phone_number, &self.phone_number);
        merge_field(&mut info.email, &self.email);
        merge_field(&mut info.occupation, &self.occupation);
        merge_field(&mut info.city_of_residence, &self.city_of_residence);
        merge_field(&mut info.country_of_residence, &self.country_of_residence);
        merge_field(&mut info.home_address, &self.home_address);
    }
}

fn merge_field(target: &mut String, incoming: &Option<String>) {
    if let Some(value) = incoming {
        if !is_blank(value) {
            *target = value.clone();
        }
    }
}

/// Proof-of-funds record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingProof {
    /// Record id
    pub id: String,
    /// Owning user
    pub owner_id: String,
    /// Free-text cash amount
    pub cash_amount: String,
    /// Bank card summary
    pub bank_cards: String,
    /// Supporting document description
    pub supporting_documents: String,
    /// Created timestamp (RFC 3339)
    pub created_at: String,
    /// Last updated timestamp (RFC 3339)
    pub updated_at: String,
}

impl FundingProof {
    /// Create an empty record for an owner with fresh id and timestamps
    pub fn new(owner_id: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: generate_record_id(),
            owner_id: owner_id.into(),
            created_at: now.clone(),
            updated_at: now,
            ..Self::default()
        }
    }

    /// Build from a legacy key-value payload; see [`Passport::from_legacy`]
    pub fn from_legacy(value: &Value, owner_id: &str) -> Option<Self> {
        let cash = legacy_string(value, &["cashAmount", "cash_amount", "cash"]);
        let cards = legacy_string(value, &["bankCards", "bank_cards", "bankCard"]);
        let documents =
            legacy_string(value, &["supportingDocuments", "supporting_documents", "documents"]);
        if cash.is_none() && cards.is_none() && documents.is_none() {
            return None;
        }
        let mut proof = FundingProof::new(owner_id);
        proof.cash_amount = cash.unwrap_or_default();
        proof.bank_cards = cards.unwrap_or_default();
        proof.supporting_documents = documents.unwrap_or_default();
        Some(proof)
    }

    /// Field-level validation messages; empty when the record is valid
    pub fn validation_errors(&self) -> Vec<String> {
        if is_blank(&self.cash_amount)
            && is_blank(&self.bank_cards)
            && is_blank(&self.supporting_documents)
        {
            vec!["at least one funding field is required".to_string()]
        } else {
            Vec::new()
        }
    }

    /// Validate, surfacing the field messages as one error
    pub fn validate(&self) -> Result<()> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(errors.join("; ")))
        }
    }

    /// Content fields as a name→value map, for conflict diffing
    pub fn content_map(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("cash_amount", self.cash_amount.clone()),
            ("bank_cards", self.bank_cards.clone()),
            ("supporting_documents", self.supporting_documents.clone()),
        ])
    }

    /// Refresh the update timestamp
    pub fn touch(&mut self) {
        self.updated_at = now_rfc3339();
    }
}

/// Partial funding-proof update; provided fields overwrite stored ones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FundingProofUpdate {
    /// Free-text cash amount
    pub cash_amount: Option<String>,
    /// Bank card summary
    pub bank_cards: Option<String>,
    /// Supporting document description
    pub supporting_documents: Option<String>,
}

impl FundingProofUpdate {
    /// Apply to an existing record
    pub fn apply_to(&self, proof: &mut FundingProof) {
        if let Some(v) = &self.cash_amount {
            proof.cash_amount = v.clone();
        }
        if let Some(v) = &self.bank_cards {
            proof.bank_cards = v.clone();
        }
        if let Some(v) = &self.supporting_documents {
            proof.supporting_documents = v.clone();
        }
    }
}

/// A record of any kind, tagged by [`RecordKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    /// Passport record
    Passport(Passport),
    /// Personal-info record
    PersonalInfo(PersonalInfo),
    /// Funding-proof record
    FundingProof(FundingProof),
}

impl Record {
    /// Kind tag
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Passport(_) => RecordKind::Passport,
            Record::PersonalInfo(_) => RecordKind::PersonalInfo,
            Record::FundingProof(_) => RecordKind::FundingProof,
        }
    }

    /// Record id
    pub fn id(&self) -> &str {
        match self {
            Record::Passport(p) => &p.id,
            Record::PersonalInfo(p) => &p.id,
            Record::FundingProof(p) => &p.id,
        }
    }

    /// Owning user
    pub fn owner_id(&self) -> &str {
        match self {
            Record::Passport(p) => &p.owner_id,
            Record::PersonalInfo(p) => &p.owner_id,
            Record::FundingProof(p) => &p.owner_id,
        }
    }

    /// Created timestamp
    pub fn created_at(&self) -> &str {
        match self {
            Record::Passport(p) => &p.created_at,
            Record::PersonalInfo(p) => &p.created_at,
            Record::FundingProof(p) => &p.created_at,
        }
    }

    /// Updated timestamp
    pub fn updated_at(&self) -> &str {
        match self {
            Record::Passport(p) => &p.updated_at,
            Record::PersonalInfo(p) => &p.updated_at,
            Record::FundingProof(p) => &p.updated_at,
        }
    }

    /// Field-level validation messages for the inner record
    pub fn validation_errors(&self) -> Vec<String> {
        match self {
            Record::Passport(p) => p.validation_errors(),
            Record::PersonalInfo(p) => p.validation_errors(),
            Record::FundingProof(p) => p.validation_errors(),
        }
    }

    /// Content fields of the inner record, for conflict diffing
    pub fn content_map(&self) -> BTreeMap<&'static str, String> {
        match self {
            Record::Passport(p) => p.content_map(),
            Record::PersonalInfo(p) => p.content_map(),
            Record::FundingProof(p) => p.content_map(),
        }
    }

    /// Inner passport, if this is one
    pub fn into_passport(self) -> Option<Passport> {
        match self {
            Record::Passport(p) => Some(p),
            _ => None,
        }
    }

    /// Inner personal info, if this is one
    pub fn into_personal_info(self) -> Option<PersonalInfo> {
        match self {
            Record::PersonalInfo(p) => Some(p),
            _ => None,
        }
    }

    /// Inner funding proof, if this is one
    pub fn into_funding_proof(self) -> Option<FundingProof> {
        match self {
            Record::FundingProof(p) => Some(p),
            _ => None,
        }
    }
}

/// Any subset of an owner's records, for all-or-nothing creation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDataInput {
    /// Passport to create, if any
    pub passport: Option<Passport>,
    /// Personal info to create, if any
    pub personal_info: Option<PersonalInfo>,
    /// Funding proof to create, if any
    pub funding_proof: Option<FundingProof>,
}

impl UserDataInput {
    /// True when no record is provided
    pub fn is_empty(&self) -> bool {
        self.passport.is_none() && self.personal_info.is_none() && self.funding_proof.is_none()
    }
}

/// Any subset of per-kind partial updates, applied atomically
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserDataUpdate {
    /// Passport update, if any
    pub passport: Option<PassportUpdate>,
    /// Personal-info update, if any
    pub personal_info: Option<PersonalInfoUpdate>,
    /// Funding-proof update, if any
    pub funding_proof: Option<FundingProofUpdate>,
}

impl UserDataUpdate {
    /// True when no update is provided
    pub fn is_empty(&self) -> bool {
        self.passport.is_none() && self.personal_info.is_none() && self.funding_proof.is_none()
    }
}

fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && tld.len() >= 2 && !email.contains(char::is_whitespace)
}

fn is_valid_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    let allowed = phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'));
    allowed && (5..=15).contains(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn valid_passport() -> Passport {
        let mut passport = Passport::new("owner-1");
        passport.passport_number = "E12345678".to_string();
        passport.full_name = "ZHANG, WEI".to_string();
        passport.date_of_birth = "1990-05-01".to_string();
        passport.nationality = "CHN".to_string();
        passport.issue_date = "2020-01-15".to_string();
        passport.issue_place = "Beijing".to_string();
        passport.expiry_date = "2030-01-14".to_string();
        passport
    }

    #[test]
    fn test_valid_passport_passes() {
        assert!(valid_passport().validate().is_ok());
    }

    #[test]
    fn test_passport_date_order_enforced() {
        let mut passport = valid_passport();
        passport.expiry_date = "2019-01-01".to_string();
        let errors = passport.validation_errors();
        assert!(errors.iter().any(|e| e.contains("expiry date")));

        let mut passport = valid_passport();
        passport.issue_date = "1989-01-01".to_string();
        let errors = passport.validation_errors();
        assert!(errors.iter().any(|e| e.contains("after date of birth")));
    }

    #[test]
    fn test_passport_birth_not_in_future() {
        let mut passport = valid_passport();
        passport.date_of_birth = "2999-01-01".to_string();
        let errors = passport.validation_errors();
        assert!(errors.iter().any(|e| e.contains("future")));
    }

    #[test]
    fn test_passport_required_fields() {
        let passport = Passport::new("owner-1");
        let errors = passport.validation_errors();
        assert!(errors.iter().any(|e| e.contains("passport number")));
        assert!(errors.iter().any(|e| e.contains("full name")));
        assert!(errors.iter().any(|e| e.contains("nationality")));
    }

    #[test]
    fn test_passport_from_legacy_normalizes() {
        let value = json!({
            "passportNumber": "E12345678",
            "fullName": "ZHANG, WEI",
            "nationality": "CHN",
        });
        let passport = Passport::from_legacy(&value, "owner-1").unwrap();
        assert_eq!(passport.owner_id, "owner-1");
        assert_eq!(passport.passport_number, "E12345678");
        assert_eq!(passport.gender, Gender::Undefined);
        assert!(!passport.id.is_empty());
        assert!(!passport.created_at.is_empty());
    }

    #[test]
    fn test_passport_from_legacy_rejects_unrecognizable() {
        assert!(Passport::from_legacy(&json!({"foo": "bar"}), "o").is_none());
        assert!(Passport::from_legacy(&json!("just a string"), "o").is_none());
    }

    #[test]
    fn test_gender_parse_loose() {
        assert_eq!(Gender::parse_loose("M"), Gender::Male);
        assert_eq!(Gender::parse_loose("female"), Gender::Female);
        assert_eq!(Gender::parse_loose("other"), Gender::Undefined);
    }

    #[test]
    fn test_personal_info_merge_skips_blank() {
        let mut info = PersonalInfo::new("owner-1");
        info.phone_number = "+66 81 234 5678".to_string();
        let update = PersonalInfoUpdate {
            phone_number: Some("".to_string()),
            email: Some("y@z.com".to_string()),
            ..PersonalInfoUpdate::default()
        };
        update.merge_into(&mut info);
        assert_eq!(info.phone_number, "+66 81 234 5678");
        assert_eq!(info.email, "y@z.com");
    }

    #[test]
    fn test_personal_info_merge_skips_whitespace_only() {
        let mut info = PersonalInfo::new("owner-1");
        info.occupation = "Engineer".to_string();
        let update = PersonalInfoUpdate {
            occupation: Some("   ".to_string()),
            ..PersonalInfoUpdate::default()
        };
        update.merge_into(&mut info);
        assert_eq!(info.occupation, "Engineer");
    }

    #[test]
    fn test_email_validation() {
        let mut info = PersonalInfo::new("owner-1");
        info.email = "not-an-email".to_string();
        assert!(info.validate().is_err());
        info.email = "y@z.com".to_string();
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_phone_validation() {
        let mut info = PersonalInfo::new("owner-1");
        info.phone_number = "call me".to_string();
        assert!(info.validate().is_err());
        info.phone_number = "+66 (81) 234-5678".to_string();
        assert!(info.validate().is_ok());
    }

    #[test]
    fn test_funding_proof_needs_one_field() {
        let proof = FundingProof::new("owner-1");
        assert!(proof.validate().is_err());

        let mut proof = FundingProof::new("owner-1");
        proof.cash_amount = "20000 THB".to_string();
        assert!(proof.validate().is_ok());
    }

    #[test]
    fn test_funding_proof_from_legacy_accepts_numeric_cash() {
        let value = json!({"cashAmount": 20000});
        let proof = FundingProof::from_legacy(&value, "owner-1").unwrap();
        assert_eq!(proof.cash_amount, "20000");
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let record = Record::Passport(valid_passport());
        let encoded = serde_json::to_string(&record).unwrap();
        let decoded: Record = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, record);
        assert_eq!(decoded.kind(), RecordKind::Passport);
    }

    proptest! {
        #[test]
        fn prop_passport_number_validation_never_panics(number in ".*") {
            let mut passport = valid_passport();
            passport.passport_number = number;
            let _ = passport.validation_errors();
        }

        #[test]
        fn prop_dates_out_of_order_always_flagged(
            issue_year in 1950i32..2020,
            expiry_offset in -30i32..0,
        ) {
            let mut passport = valid_passport();
            passport.date_of_birth = "1940-01-01".to_string();
            passport.issue_date = format!("{issue_year:04}-06-01");
            passport.expiry_date = format!("{:04}-06-01", issue_year + expiry_offset);
            prop_assert!(passport
                .validation_errors()
                .iter()
                .any(|e| e.contains("expiry date")));
        }
    }
}
