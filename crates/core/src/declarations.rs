//! Advance-directive and organ-donation-opposition declarations.
//!
//! A patient holds at most one of each.

use crate::catalog::CatalogKind;
use crate::codes::{Coded, YesNo};
use crate::error::ValidationErrors;
use crate::validation::{check_code, optional, parse_date};
use chrono::NaiveDate;
use registry_uuid::RecordId;
use serde::{Deserialize, Serialize};

fn subscription_date(
    errors: &mut ValidationErrors,
    raw: &str,
    today: NaiveDate,
) -> Option<Option<NaiveDate>> {
    let Some(value) = optional(raw) else {
        return Some(None);
    };
    let parsed = parse_date(value).and_then(|date| {
        if date > today {
            Err("subscription date cannot be in the future".to_string())
        } else {
            Ok(date)
        }
    });
    errors.check("subscribed_on", parsed).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvanceDirectiveDraft {
    pub has_directive: String,
    pub subscribed_on: String,
    pub health_provider: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvanceDirective {
    pub patient_id: RecordId,
    pub has_directive: YesNo,
    pub subscribed_on: Option<NaiveDate>,
    pub health_provider: String,
}

impl AdvanceDirectiveDraft {
    pub fn validate(
        &self,
        patient_id: RecordId,
        today: NaiveDate,
    ) -> Result<AdvanceDirective, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let has_directive = errors.check("has_directive", YesNo::parse_code(&self.has_directive));
        let subscribed_on = subscription_date(&mut errors, &self.subscribed_on, today);
        let health_provider = errors.check(
            "health_provider",
            check_code(CatalogKind::HealthProvider, &self.health_provider),
        );

        match (has_directive, subscribed_on, health_provider) {
            (Some(has_directive), Some(subscribed_on), Some(health_provider)) => {
                Ok(AdvanceDirective {
                    patient_id,
                    has_directive,
                    subscribed_on,
                    health_provider,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DonationOppositionDraft {
    pub opposes: String,
    pub subscribed_on: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationOpposition {
    pub patient_id: RecordId,
    pub opposes: YesNo,
    pub subscribed_on: Option<NaiveDate>,
}

impl DonationOppositionDraft {
    pub fn validate(
        &self,
        patient_id: RecordId,
        today: NaiveDate,
    ) -> Result<DonationOpposition, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let opposes = errors.check("opposes", YesNo::parse_code(&self.opposes));
        let subscribed_on = subscription_date(&mut errors, &self.subscribed_on, today);

        match (opposes, subscribed_on) {
            (Some(opposes), Some(subscribed_on)) => Ok(DonationOpposition {
                patient_id,
                opposes,
                subscribed_on,
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn directive_draft_collects_all_errors() {
        let draft = AdvanceDirectiveDraft {
            has_directive: "MAYBE".into(),
            subscribed_on: "2030-01-01".into(),
            health_provider: "eps".into(),
        };
        let errors = draft.validate(RecordId::new(), today()).unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["has_directive", "subscribed_on", "health_provider"]
        );
    }

    #[test]
    fn blank_subscription_date_is_none() {
        let opposition = DonationOppositionDraft {
            opposes: "SI".into(),
            subscribed_on: " ".into(),
        }
        .validate(RecordId::new(), today())
        .unwrap();
        assert!(opposition.opposes.is_yes());
        assert_eq!(opposition.subscribed_on, None);
    }
}
