//! Closed two-character code enumerations.
//!
//! Every enumerated column is a Rust enum; raw codes are only accepted through
//! [`Coded::from_code`], so an invalid code cannot exist past the boundary.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// A value stored and exchanged as a fixed code.
pub trait Coded: Sized + Copy + 'static {
    /// Every variant, in code order.
    const ALL: &'static [Self];

    fn code(self) -> &'static str;

    fn label(self) -> &'static str;

    fn from_code(code: &str) -> Option<Self>;

    /// Comma-separated list of accepted codes, for error messages.
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|v| v.code())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Parses a code, describing the accepted codes on failure.
    fn parse_code(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        Self::from_code(trimmed)
            .ok_or_else(|| format!("unknown code '{}', expected one of {}", trimmed, Self::expected()))
    }
}

macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $code:literal, $label:literal;)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl Coded for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code,)+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }

            fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.code())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                <$name as Coded>::parse_code(&s).map_err(serde::de::Error::custom)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.code()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                <$name as Coded>::from_code(raw).ok_or_else(|| {
                    FromSqlError::Other(format!("unknown {} code '{}'", stringify!($name), raw).into())
                })
            }
        }
    };
}

coded_enum! {
    /// Two-value yes/no flag (provider roles, declarations).
    YesNo {
        Yes => "SI", "Sí";
        No => "NO", "No";
    }
}

impl YesNo {
    pub fn is_yes(self) -> bool {
        matches!(self, YesNo::Yes)
    }
}

impl From<bool> for YesNo {
    fn from(value: bool) -> Self {
        if value {
            YesNo::Yes
        } else {
            YesNo::No
        }
    }
}

coded_enum! {
    BiologicalSex {
        Male => "01", "Hombre";
        Female => "02", "Mujer";
        Indeterminate => "03", "Indeterminado o intersexual";
    }
}

coded_enum! {
    GenderIdentity {
        Male => "01", "Masculino";
        Female => "02", "Femenino";
        Transgender => "03", "Transgénero";
        NonBinary => "04", "Neutro";
        Other => "05", "Otro";
        NotDeclared => "99", "No lo declara";
    }
}

coded_enum! {
    ResidentialZone {
        Urban => "01", "Urbana";
        Rural => "02", "Rural";
    }
}

coded_enum! {
    /// Service group of a health-service contact.
    ServiceGroup {
        Outpatient => "01", "Consulta externa";
        DiagnosticSupport => "02", "Apoyo diagnóstico y complementación terapéutica";
        Inpatient => "03", "Internación";
        Surgical => "04", "Quirúrgico";
        ImmediateCare => "05", "Atención inmediata";
    }
}

coded_enum! {
    /// Setting in which care was delivered.
    CareSetting {
        Home => "01", "Hogar";
        Community => "02", "Comunitario";
        School => "03", "Escolar";
        Workplace => "04", "Laboral";
        Institutional => "05", "Institucional";
    }
}

coded_enum! {
    /// Triage level. Informational only; it does not drive any transition.
    TriageClassification {
        Level1 => "01", "Triage I";
        Level2 => "02", "Triage II";
        Level3 => "03", "Triage III";
        Level4 => "04", "Triage IV";
        Level5 => "05", "Triage V";
    }
}

coded_enum! {
    DiagnosisType {
        Impression => "01", "Impresión diagnóstica";
        ConfirmedNew => "02", "Confirmado nuevo";
        ConfirmedRecurrent => "03", "Confirmado repetido";
    }
}
