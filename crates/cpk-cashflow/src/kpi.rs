//! Executive KPIs: a read-only reduction over a built matrix.

use chrono::NaiveDate;
use cpk_calendar::PeriodKey;
use cpk_money::Cents;
use serde::{Deserialize, Serialize, Serializer};

use crate::matrix::CashFlowMatrix;

/// Look-ahead length of the planned-net trend.
pub const TREND_LEN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorstPoint {
    pub period: PeriodKey,
    pub balance: Cents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub period: PeriodKey,
    pub planned_net: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub planned_income: Cents,
    pub planned_expense: Cents,
    pub realised_income: Cents,
    pub realised_expense: Cents,
    pub planned_net: Cents,
    pub realised_net: Cents,
    /// realised - planned
    pub income_delta: Cents,
    pub expense_delta: Cents,
    pub net_delta: Cents,
    /// Period with the minimum adjusted planned balance (earliest on ties).
    pub worst_point: WorstPoint,
    /// Planned net of the periods after the one containing `today`;
    /// `None` where the matrix ends first.
    pub trend: [Option<TrendPoint>; TREND_LEN],
}

/// Callers must branch on the variant before reading any number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutiveKpis {
    NoData,
    Data(KpiSummary),
}

impl ExecutiveKpis {
    pub fn has_data(&self) -> bool {
        matches!(self, ExecutiveKpis::Data(_))
    }
}

/// `{"has_data": false}` or `{"has_data": true, ...summary}`.
impl Serialize for ExecutiveKpis {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Out<'a> {
            has_data: bool,
            #[serde(flatten, skip_serializing_if = "Option::is_none")]
            summary: Option<&'a KpiSummary>,
        }
        let summary = match self {
            ExecutiveKpis::NoData => None,
            ExecutiveKpis::Data(s) => Some(s),
        };
        Out {
            has_data: summary.is_some(),
            summary,
        }
        .serialize(serializer)
    }
}

pub fn derive_kpis(matrix: &CashFlowMatrix, today: NaiveDate) -> ExecutiveKpis {
    let Some(first) = matrix.periods.first() else {
        return ExecutiveKpis::NoData;
    };

    let planned_income: Cents = matrix.periods.iter().map(|b| b.planned_income).sum();
    let planned_expense: Cents = matrix.periods.iter().map(|b| b.planned_expense).sum();
    let realised_income: Cents = matrix.periods.iter().map(|b| b.realised_income).sum();
    let realised_expense: Cents = matrix.periods.iter().map(|b| b.realised_expense).sum();
    let planned_net = planned_income - planned_expense;
    let realised_net = realised_income - realised_expense;

    let mut worst = WorstPoint {
        period: first.period,
        balance: first.planned_cum_adj,
    };
    for b in &matrix.periods {
        if b.planned_cum_adj < worst.balance {
            worst = WorstPoint {
                period: b.period,
                balance: b.planned_cum_adj,
            };
        }
    }

    let current = PeriodKey::containing(today, matrix.request.granularity);
    let mut trend = [None; TREND_LEN];
    for (slot, b) in trend
        .iter_mut()
        .zip(matrix.periods.iter().filter(|b| b.period > current))
    {
        *slot = Some(TrendPoint {
            period: b.period,
            planned_net: b.planned_net(),
        });
    }

    ExecutiveKpis::Data(KpiSummary {
        planned_income,
        planned_expense,
        realised_income,
        realised_expense,
        planned_net,
        realised_net,
        income_delta: realised_income - planned_income,
        expense_delta: realised_expense - planned_expense,
        net_delta: realised_net - planned_net,
        worst_point: worst,
        trend,
    })
}
