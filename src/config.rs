//
// config.rs
// dicom-organizer
//
// Ordered bucket rules and run options; validates date bounds before any file is touched.
//

use chrono::NaiveDate;

use crate::error::PipelineError;

/// Folder name for files no rule claims.
pub const UNSORTED_BUCKET: &str = "_unsorted";

/// Inclusive StudyDate window. A range is only active when the lower bound
/// was configured; the upper bound is optional.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        if date < self.from {
            return false;
        }
        match self.to {
            Some(to) => date <= to,
            None => true,
        }
    }
}

/// One classification rule. Rules are evaluated strictly in `Vec` order:
/// all date ranges first, then all keyword groups, so precedence is carried
/// by the list and never by map iteration order.
#[derive(Debug, Clone)]
pub struct BucketRule {
    pub id: String,
    pub date_range: Option<DateRange>,
    /// Upper-cased substrings matched against the joined descriptor text.
    pub keywords: Vec<&'static str>,
}

/// Options for one organize run, owned by the run itself.
#[derive(Debug, Clone)]
pub struct OrganizeConfig {
    pub rules: Vec<BucketRule>,
    pub copy_dicom: bool,
}

impl OrganizeConfig {
    /// Builds the default shoulder/ankle rule list from the raw CLI bounds
    /// (`YYYYMMDD`, empty string = unset). Malformed or inverted bounds are a
    /// fatal configuration error.
    pub fn from_cli(
        shoulder_from: &str,
        shoulder_to: &str,
        ankle_from: &str,
        ankle_to: &str,
        copy_dicom: bool,
    ) -> Result<Self, PipelineError> {
        let rules = vec![
            BucketRule {
                id: "01_surg_shoulder".to_string(),
                date_range: parse_range(shoulder_from, shoulder_to, "shoulder")?,
                keywords: vec!["SHOULDER", "ROTATOR", "CLAVICLE", "HUMERUS", "AC JOINT"],
            },
            BucketRule {
                id: "02_surg_ankle".to_string(),
                date_range: parse_range(ankle_from, ankle_to, "ankle")?,
                keywords: vec!["ANKLE", "MALLEOLUS", "TIBIA", "FIBULA", "FOOT", "TALAR"],
            },
        ];
        Ok(Self { rules, copy_dicom })
    }

    /// Rules with every date range disabled, used by the `info` verb.
    pub fn default_rules() -> Vec<BucketRule> {
        Self::from_cli("", "", "", "", false)
            .map(|c| c.rules)
            .unwrap_or_default()
    }
}

fn parse_range(from: &str, to: &str, label: &str) -> Result<Option<DateRange>, PipelineError> {
    let from = parse_bound(from, label)?;
    let to = parse_bound(to, label)?;
    match (from, to) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(PipelineError::Config(format!(
            "--{label}-to requires --{label}-from"
        ))),
        (Some(from), to) => {
            if let Some(to) = to {
                if to < from {
                    return Err(PipelineError::Config(format!(
                        "--{label}-to is before --{label}-from"
                    )));
                }
            }
            Ok(Some(DateRange { from, to }))
        }
    }
}

fn parse_bound(raw: &str, label: &str) -> Result<Option<NaiveDate>, PipelineError> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .map(Some)
        .map_err(|_| {
            PipelineError::Config(format!(
                "invalid {label} date {raw:?}, expected YYYYMMDD"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_disable_the_range() {
        let config = OrganizeConfig::from_cli("", "", "", "", false).expect("config");
        assert!(config.rules.iter().all(|r| r.date_range.is_none()));
    }

    #[test]
    fn malformed_date_is_fatal() {
        let err = OrganizeConfig::from_cli("2024-03-01", "", "", "", false).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn inverted_range_is_fatal() {
        let err = OrganizeConfig::from_cli("20240331", "20240301", "", "", false).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn upper_bound_without_lower_is_fatal() {
        let err = OrganizeConfig::from_cli("", "20240331", "", "", false).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap().into(),
        };
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()));
        assert!(range.contains(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()));
        assert!(!range.contains(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()));
    }
}
