#![forbid(unsafe_code)]

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, OwnerIdError> {
        let value = value.into();
        validate_owner(&value)?;
        Ok(Self(value))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OwnerIdError {
    Empty,
    TooLong,
    InvalidFirstChar,
    InvalidChar { ch: char, index: usize },
}

impl OwnerIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "owner must not be empty",
            Self::TooLong => "owner is too long",
            Self::InvalidFirstChar => "owner must start with an alphanumeric character",
            Self::InvalidChar { .. } => "owner contains an invalid character",
        }
    }
}

fn validate_owner(value: &str) -> Result<(), OwnerIdError> {
    if value.is_empty() {
        return Err(OwnerIdError::Empty);
    }
    if value.len() > 128 {
        return Err(OwnerIdError::TooLong);
    }
    let mut chars = value.chars();
    let Some(first) = chars.next() else {
        return Err(OwnerIdError::Empty);
    };
    if !first.is_ascii_alphanumeric() {
        return Err(OwnerIdError::InvalidFirstChar);
    }
    for (index, ch) in value.chars().enumerate() {
        if index == 0 {
            continue;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-') {
            continue;
        }
        return Err(OwnerIdError::InvalidChar { ch, index });
    }
    Ok(())
}

/// Canonical textual UUID of one evidence submission. Stored lowercase.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EvidenceUuid(String);

impl EvidenceUuid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, EvidenceUuidError> {
        let value = value.into();
        let trimmed = value.trim();
        validate_uuid(trimmed)?;
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvidenceUuidError {
    Empty,
    InvalidLength,
    InvalidGroup,
    InvalidChar,
}

impl EvidenceUuidError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "evidence uuid must not be empty",
            Self::InvalidLength => "evidence uuid must be 36 characters",
            Self::InvalidGroup => "evidence uuid groups must be 8-4-4-4-12",
            Self::InvalidChar => "evidence uuid must be hexadecimal",
        }
    }
}

fn validate_uuid(value: &str) -> Result<(), EvidenceUuidError> {
    if value.is_empty() {
        return Err(EvidenceUuidError::Empty);
    }
    if value.len() != 36 {
        return Err(EvidenceUuidError::InvalidLength);
    }
    for (index, ch) in value.chars().enumerate() {
        if matches!(index, 8 | 13 | 18 | 23) {
            if ch != '-' {
                return Err(EvidenceUuidError::InvalidGroup);
            }
        } else if !ch.is_ascii_hexdigit() {
            return Err(EvidenceUuidError::InvalidChar);
        }
    }
    Ok(())
}

/// One identity value as recorded or referenced by alias edges. Usually a
/// 64-hex digest, but operators may alias toward hand-assigned custom ids,
/// so the shape is deliberately loose.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdentityValue(String);

impl IdentityValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, IdentityValueError> {
        let value = value.into();
        let trimmed = value.trim();
        validate_identity_value(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// First six characters, uppercased: the human-facing short id.
    pub fn short_id(&self) -> String {
        self.0.chars().take(6).collect::<String>().to_uppercase()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdentityValueError {
    Empty,
    TooLong,
    ContainsControl,
}

impl IdentityValueError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "identity value must not be empty",
            Self::TooLong => "identity value is too long",
            Self::ContainsControl => "identity value contains control characters",
        }
    }
}

fn validate_identity_value(value: &str) -> Result<(), IdentityValueError> {
    if value.is_empty() {
        return Err(IdentityValueError::Empty);
    }
    if value.len() > 256 {
        return Err(IdentityValueError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(IdentityValueError::ContainsControl);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_accepts_typical_handles() {
        let owner = OwnerId::try_new("circular-lab.eu").expect("valid owner");
        assert_eq!(owner.as_str(), "circular-lab.eu");
    }

    #[test]
    fn owner_rejects_empty_and_bad_chars() {
        assert_eq!(OwnerId::try_new("").unwrap_err(), OwnerIdError::Empty);
        assert_eq!(
            OwnerId::try_new("-lab").unwrap_err(),
            OwnerIdError::InvalidFirstChar
        );
        assert_eq!(
            OwnerId::try_new("lab one").unwrap_err(),
            OwnerIdError::InvalidChar { ch: ' ', index: 3 }
        );
    }

    #[test]
    fn evidence_uuid_canonicalizes_to_lowercase() {
        let uuid = EvidenceUuid::try_new("9F10A9C2-7D2E-4D2F-9B5A-0C6C83FE9D01").expect("valid");
        assert_eq!(uuid.as_str(), "9f10a9c2-7d2e-4d2f-9b5a-0c6c83fe9d01");
    }

    #[test]
    fn evidence_uuid_rejects_malformed_values() {
        assert_eq!(
            EvidenceUuid::try_new("").unwrap_err(),
            EvidenceUuidError::Empty
        );
        assert_eq!(
            EvidenceUuid::try_new("9f10a9c2").unwrap_err(),
            EvidenceUuidError::InvalidLength
        );
        assert_eq!(
            EvidenceUuid::try_new("9f10a9c2x7d2e-4d2f-9b5a-0c6c83fe9d01").unwrap_err(),
            EvidenceUuidError::InvalidGroup
        );
        assert_eq!(
            EvidenceUuid::try_new("9g10a9c2-7d2e-4d2f-9b5a-0c6c83fe9d01").unwrap_err(),
            EvidenceUuidError::InvalidChar
        );
    }

    #[test]
    fn identity_value_trims_and_validates() {
        let value = IdentityValue::try_new("  abcdef0123  ").expect("valid");
        assert_eq!(value.as_str(), "abcdef0123");
        assert_eq!(
            IdentityValue::try_new("a\nb").unwrap_err(),
            IdentityValueError::ContainsControl
        );
        assert_eq!(
            IdentityValue::try_new("   ").unwrap_err(),
            IdentityValueError::Empty
        );
    }

    #[test]
    fn short_id_is_first_six_uppercased() {
        let value = IdentityValue::try_new("ab12cd34ef").expect("valid");
        assert_eq!(value.short_id(), "AB12CD");
        let short = IdentityValue::try_new("ab1").expect("valid");
        assert_eq!(short.short_id(), "AB1");
    }
}
