use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{DepositRecord, FeeType, ResolvedFee};
use crate::months::{AcademicMonth, AcademicYear};
use crate::resolver::ResolvedByMonth;

/// Months the clerk has ticked for payment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    months: BTreeSet<AcademicMonth>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the month if absent, remove it if present.
    pub fn toggle(mut self, month: AcademicMonth) -> Self {
        if !self.months.remove(&month) {
            self.months.insert(month);
        }
        self
    }

    pub fn contains(&self, month: AcademicMonth) -> bool {
        self.months.contains(&month)
    }

    pub fn months(&self, year: &AcademicYear) -> Vec<AcademicMonth> {
        year.sorted(&self.months)
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub fee_type: FeeType,
    pub months: Vec<(AcademicMonth, Decimal)>,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub lines: Vec<ReceiptLine>,
    pub total: Decimal,
}

fn month_fees<'a>(selection: &SelectionState, resolved: &'a ResolvedByMonth) -> impl Iterator<Item = (AcademicMonth, &'a ResolvedFee)> + 'a {
    let months: Vec<AcademicMonth> = selection.months.iter().copied().collect();
    months.into_iter().flat_map(move |m| {
        resolved
            .get(&m)
            .into_iter()
            .flat_map(move |fees| fees.iter().map(move |f| (m, f)))
    })
}

/// Sum of every resolved component across the selected months.
pub fn total(selection: &SelectionState, resolved: &ResolvedByMonth) -> Decimal {
    month_fees(selection, resolved).map(|(_, f)| f.amount).sum()
}

/// Receipt lines grouped by fee type, months in academic order.
pub fn breakdown(selection: &SelectionState, resolved: &ResolvedByMonth, year: &AcademicYear) -> Receipt {
    let mut grouped: BTreeMap<FeeType, Vec<(AcademicMonth, Decimal)>> = BTreeMap::new();
    for (month, fee) in month_fees(selection, resolved) {
        grouped.entry(fee.fee_type).or_default().push((month, fee.amount));
    }

    let lines: Vec<ReceiptLine> = grouped
        .into_iter()
        .map(|(fee_type, mut months)| {
            months.sort_by_key(|(m, _)| year.position(*m));
            let subtotal = months.iter().map(|(_, a)| *a).sum();
            ReceiptLine {
                fee_type,
                months,
                subtotal,
            }
        })
        .collect();
    let total = lines.iter().map(|l| l.subtotal).sum();
    Receipt { lines, total }
}

/// Rebuild a receipt from stored deposit records.
pub fn receipt_from_records(records: &[DepositRecord], year: &AcademicYear) -> Receipt {
    let mut selection = SelectionState::new();
    let mut resolved = ResolvedByMonth::new();
    for record in records {
        if !selection.contains(record.month) {
            selection = selection.toggle(record.month);
        }
        resolved.entry(record.month).or_default().extend(
            record
                .component_amounts
                .iter()
                .map(|(fee_type, amount)| ResolvedFee {
                    fee_type: *fee_type,
                    amount: *amount,
                }),
        );
    }
    breakdown(&selection, &resolved, year)
}
