//! Fixed choice sets stored as upper-case strings.

use super::DomainError;

macro_rules! choice_enum {
    ($name:ident, $what:literal, { $($variant:ident => ($code:literal, $label:literal)),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn label(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            /// Case-insensitive parse. Blank input yields `Ok(None)`.
            pub fn parse(value: &str) -> Result<Option<Self>, DomainError> {
                let value = value.trim();
                if value.is_empty() {
                    return Ok(None);
                }
                let upper = value.to_uppercase();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|c| c.as_str() == upper)
                    .map(Some)
                    .ok_or_else(|| {
                        let codes: Vec<&str> = Self::ALL.iter().map(|c| c.as_str()).collect();
                        DomainError::Validation(format!(
                            "Invalid {}. Choose from {}",
                            $what,
                            codes.join(", ")
                        ))
                    })
            }

            /// Display label for a stored code; unknown codes have none.
            pub fn label_of(code: Option<&str>) -> Option<&'static str> {
                code.and_then(|c| Self::parse(c).ok().flatten()).map(|c| c.label())
            }
        }
    };
}

choice_enum!(Gender, "gender", {
    Male => ("MALE", "Masculino"),
    Female => ("FEMALE", "Feminino"),
});

choice_enum!(DocumentType, "document type", {
    IdCard => ("ID_CARD", "ID Card"),
    BirthCertificate => ("BIRTH_CERTIFICATE", "Birth Certificate"),
    Passport => ("PASSPORT", "Passport"),
});

choice_enum!(GuardianRelationship, "guardian relationship", {
    Father => ("FATHER", "Pai"),
    Mother => ("MOTHER", "Mãe"),
    Grandparent => ("GRANDPARENT", "Avô/Avó"),
    Brother => ("BROTHER", "Irmão"),
    Sister => ("SISTER", "Irmã"),
    Uncle => ("UNCLE", "Tio"),
    Aunt => ("AUNT", "Tia"),
    Cousin => ("COUSIN", "Primo"),
    Other => ("OTHER", "Outro"),
});

impl DocumentType {
    /// Order in which verified documents are picked as the primary identification.
    pub const PRIMARY_PRIORITY: [DocumentType; 3] = [
        DocumentType::Passport,
        DocumentType::IdCard,
        DocumentType::BirthCertificate,
    ];
}

/// Parse an optional choice field into its canonical stored code.
pub fn normalize<C>(
    value: Option<String>,
    parse: fn(&str) -> Result<Option<C>, DomainError>,
    code: fn(&C) -> &'static str,
) -> Result<Option<String>, DomainError> {
    match value {
        Some(v) => Ok(parse(&v)?.map(|c| code(&c).to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Gender::parse("male").unwrap(), Some(Gender::Male));
        assert_eq!(
            DocumentType::parse(" passport ").unwrap(),
            Some(DocumentType::Passport)
        );
        assert_eq!(
            GuardianRelationship::parse("Grandparent").unwrap(),
            Some(GuardianRelationship::Grandparent)
        );
    }

    #[test]
    fn blank_parses_to_none() {
        assert_eq!(Gender::parse("").unwrap(), None);
        assert_eq!(Gender::parse("   ").unwrap(), None);
    }

    #[test]
    fn unknown_value_is_a_validation_error() {
        let err = Gender::parse("OTHER").unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("MALE, FEMALE")));
    }

    #[test]
    fn labels() {
        assert_eq!(Gender::label_of(Some("FEMALE")), Some("Feminino"));
        assert_eq!(GuardianRelationship::Mother.label(), "Mãe");
        assert_eq!(DocumentType::label_of(Some("ID_CARD")), Some("ID Card"));
        assert_eq!(DocumentType::label_of(None), None);
    }

    #[test]
    fn normalize_stores_canonical_code() {
        let stored = normalize(Some("female".to_string()), Gender::parse, Gender::as_str).unwrap();
        assert_eq!(stored.as_deref(), Some("FEMALE"));
        let blank = normalize(Some(String::new()), Gender::parse, Gender::as_str).unwrap();
        assert_eq!(blank, None);
    }
}
