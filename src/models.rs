use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BursarError, Result};
use crate::months::AcademicMonth;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Tuition,
    Admission,
    Exam,
    Library,
    Sports,
    Transport,
    Late,
    Other,
}

pub const ALL_FEE_TYPES: &[FeeType] = &[
    FeeType::Tuition,
    FeeType::Admission,
    FeeType::Exam,
    FeeType::Library,
    FeeType::Sports,
    FeeType::Transport,
    FeeType::Late,
    FeeType::Other,
];

impl FeeType {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Tuition => "tuition",
            Self::Admission => "admission",
            Self::Exam => "exam",
            Self::Library => "library",
            Self::Sports => "sports",
            Self::Transport => "transport",
            Self::Late => "late",
            Self::Other => "other",
        }
    }

    /// Tag used by the fee-structure screens, e.g. `tuitionFee`.
    fn long_key(&self) -> &'static str {
        match self {
            Self::Tuition => "tuitionfee",
            Self::Admission => "admissionfee",
            Self::Exam => "examfee",
            Self::Library => "libraryfee",
            Self::Sports => "sportsfee",
            Self::Transport => "transportationfee",
            Self::Late => "latefee",
            Self::Other => "otherfee",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tuition => "Tuition",
            Self::Admission => "Admission",
            Self::Exam => "Exam",
            Self::Library => "Library",
            Self::Sports => "Sports",
            Self::Transport => "Transport",
            Self::Late => "Late fee",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for FeeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FeeType {
    type Err = BursarError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_lowercase();
        ALL_FEE_TYPES
            .iter()
            .find(|t| t.key() == needle || t.long_key() == needle || (**t == FeeType::Transport && needle == "transportfee"))
            .copied()
            .ok_or_else(|| BursarError::UnknownFeeType(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmountMode {
    Fixed(Decimal),
    /// Amount comes from the student's own record (transport only).
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeScheduleEntry {
    pub fee_type: FeeType,
    pub class_name: String,
    pub session: String,
    pub month: AcademicMonth,
    pub amount_mode: AmountMode,
}

impl FeeScheduleEntry {
    pub fn fixed(fee_type: FeeType, class_name: &str, session: &str, month: AcademicMonth, amount: Decimal) -> Self {
        Self {
            fee_type,
            class_name: class_name.to_string(),
            session: session.to_string(),
            month,
            amount_mode: AmountMode::Fixed(amount),
        }
    }

    pub fn dynamic(fee_type: FeeType, class_name: &str, session: &str, month: AcademicMonth) -> Self {
        Self {
            fee_type,
            class_name: class_name.to_string(),
            session: session.to_string(),
            month,
            amount_mode: AmountMode::Dynamic,
        }
    }

    /// Fixed amount, or zero for dynamic entries.
    pub fn amount(&self) -> Decimal {
        match self.amount_mode {
            AmountMode::Fixed(a) => a,
            AmountMode::Dynamic => Decimal::ZERO,
        }
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self.amount_mode, AmountMode::Dynamic)
    }
}

/// Student data needed to resolve and record fees. Read once per deposit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentFeeContext {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub section: Option<String>,
    pub session: String,
    pub admission_no: Option<String>,
    pub roll_no: Option<String>,
    pub dynamic_transport_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepositStatus {
    Paid,
    Cancelled,
}

impl DepositStatus {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "paid" => Some(Self::Paid),
            "cancelled" | "canceled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRecord {
    pub receipt_no: String,
    pub student_id: String,
    pub month: AcademicMonth,
    pub session: String,
    pub school_id: String,
    pub component_amounts: BTreeMap<FeeType, Decimal>,
    pub total_amount: Decimal,
    pub transport_amount: Decimal,
    pub late_amount: Decimal,
    pub status: DepositStatus,
    pub created_at: NaiveDateTime,
}

/// One applicable fee component after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedFee {
    pub fee_type: FeeType,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_type_parses_short_and_long_tags() {
        assert_eq!("tuition".parse::<FeeType>().unwrap(), FeeType::Tuition);
        assert_eq!("tuitionFee".parse::<FeeType>().unwrap(), FeeType::Tuition);
        assert_eq!("transportationFee".parse::<FeeType>().unwrap(), FeeType::Transport);
        assert_eq!("LATEFEE".parse::<FeeType>().unwrap(), FeeType::Late);
        assert!("parking".parse::<FeeType>().is_err());
    }

    #[test]
    fn test_entry_amount() {
        let fixed = FeeScheduleEntry::fixed(FeeType::Exam, "VI", "2024-25", AcademicMonth::May, dec!(300));
        let dynamic = FeeScheduleEntry::dynamic(FeeType::Transport, "VI", "2024-25", AcademicMonth::May);
        assert_eq!(fixed.amount(), dec!(300));
        assert_eq!(dynamic.amount(), Decimal::ZERO);
        assert!(dynamic.is_dynamic());
    }

    #[test]
    fn test_deposit_record_json_roundtrip() {
        let record = DepositRecord {
            receipt_no: "RC-0123456789".to_string(),
            student_id: "S1".to_string(),
            month: AcademicMonth::April,
            session: "2024-25".to_string(),
            school_id: "SCH".to_string(),
            component_amounts: BTreeMap::from([(FeeType::Tuition, dec!(2000))]),
            total_amount: dec!(2000),
            transport_amount: Decimal::ZERO,
            late_amount: Decimal::ZERO,
            status: DepositStatus::Paid,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 4, 10)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"created_at\":\"2024-04-10T09:30:00\""));
        let back: DepositRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_deposit_status_parse() {
        assert_eq!(DepositStatus::parse("Paid"), Some(DepositStatus::Paid));
        assert_eq!(DepositStatus::parse("canceled"), Some(DepositStatus::Cancelled));
        assert_eq!(DepositStatus::parse("pending"), None);
    }
}
