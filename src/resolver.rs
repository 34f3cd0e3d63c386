use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::catalog::FeeCatalog;
use crate::error::FeeWarning;
use crate::models::{AmountMode, FeeScheduleEntry, FeeType, ResolvedFee, StudentFeeContext};
use crate::months::{AcademicMonth, AcademicYear};
use crate::selection::SelectionState;

/// Resolved fee components per selected month.
pub type ResolvedByMonth = BTreeMap<AcademicMonth, Vec<ResolvedFee>>;

/// Late-fee rule on January-first month indices.
///
/// Both in the Apr..Dec segment: late iff the selected month is already behind
/// today. Today in the Jan..Mar tail and the selected month in Apr..Dec: always
/// late. Every other combination, including both in the tail, is not late.
pub fn is_late_applicable(current_idx: u32, selected_idx: u32, session_start_idx: u32) -> bool {
    let current_in_head = current_idx >= session_start_idx;
    let selected_in_head = selected_idx >= session_start_idx;
    match (current_in_head, selected_in_head) {
        (true, true) => selected_idx < current_idx,
        (false, true) => true,
        // Jan..Mar selections are not covered by the fee policy yet.
        (_, false) => false,
    }
}

pub fn late_fee_applies(today: NaiveDate, month: AcademicMonth, year: &AcademicYear) -> bool {
    is_late_applicable(
        AcademicMonth::of_date(today).calendar_index(),
        month.calendar_index(),
        year.start_index(),
    )
}

/// Applicable fee amounts for one month.
///
/// Dynamic transport takes the student's own amount (zero without a vehicle).
/// A late entry that does not apply is left out rather than zeroed.
pub fn resolve(
    entries: &[&FeeScheduleEntry],
    month: AcademicMonth,
    context: &StudentFeeContext,
    today: NaiveDate,
    year: &AcademicYear,
) -> Vec<ResolvedFee> {
    resolve_with_warnings(entries, month, context, today, year).0
}

fn resolve_with_warnings(
    entries: &[&FeeScheduleEntry],
    month: AcademicMonth,
    context: &StudentFeeContext,
    today: NaiveDate,
    year: &AcademicYear,
) -> (Vec<ResolvedFee>, Vec<FeeWarning>) {
    let late = late_fee_applies(today, month, year);
    let mut fees = Vec::with_capacity(entries.len());
    let mut warnings = Vec::new();

    for entry in entries {
        let amount = match (entry.fee_type, entry.amount_mode) {
            (FeeType::Late, _) if !late => continue,
            (FeeType::Transport, AmountMode::Dynamic) => {
                context.dynamic_transport_amount.unwrap_or(Decimal::ZERO)
            }
            (fee_type, AmountMode::Dynamic) => {
                warnings.push(FeeWarning::UnsupportedDynamic {
                    fee_type: fee_type.key().to_string(),
                    month,
                });
                continue;
            }
            (_, AmountMode::Fixed(amount)) => amount,
        };
        fees.push(ResolvedFee {
            fee_type: entry.fee_type,
            amount,
        });
    }
    (fees, warnings)
}

/// Resolve every selected month for one student against the catalog.
pub fn resolve_selection(
    catalog: &FeeCatalog,
    selection: &SelectionState,
    context: &StudentFeeContext,
    today: NaiveDate,
    year: &AcademicYear,
) -> (ResolvedByMonth, Vec<FeeWarning>) {
    let mut resolved = ResolvedByMonth::new();
    let mut warnings = Vec::new();

    for month in selection.months(year) {
        let entries = catalog.entries_for(&context.class_name, &context.session, month);
        if entries.is_empty() {
            warnings.push(FeeWarning::NoFeesConfigured {
                class_name: context.class_name.clone(),
                month,
            });
        }
        let (fees, mut w) = resolve_with_warnings(&entries, month, context, today, year);
        warnings.append(&mut w);
        resolved.insert(month, fees);
    }

    for w in &warnings {
        tracing::info!(student_id = %context.student_id, "{w}");
    }
    (resolved, warnings)
}
