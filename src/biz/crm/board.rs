use database_entity::resource::{Deal, DealStage, Debt, DebtStatus};
use serde::Serialize;

/// One kanban column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardColumn<K, T> {
  pub key: K,
  pub title: &'static str,
  pub items: Vec<T>,
}

pub type DealBoard = Vec<BoardColumn<DealStage, Deal>>;
pub type DebtBoard = Vec<BoardColumn<DebtStatus, Debt>>;

/// Deals grouped by stage. Every stage gets a column, empty ones included, and deals keep
/// their relative order inside a column.
pub fn deal_board(deals: &[Deal]) -> DealBoard {
  DealStage::ALL
    .into_iter()
    .map(|stage| BoardColumn {
      key: stage,
      title: stage.title(),
      items: deals
        .iter()
        .filter(|deal| deal.stage == stage)
        .cloned()
        .collect(),
    })
    .collect()
}

pub fn debt_board(debts: &[Debt]) -> DebtBoard {
  DebtStatus::ALL
    .into_iter()
    .map(|status| BoardColumn {
      key: status,
      title: status.title(),
      items: debts
        .iter()
        .filter(|debt| debt.status == status)
        .cloned()
        .collect(),
    })
    .collect()
}

/// Sum of the parsable amounts of a column. Amounts are free text, unparsable ones count
/// as zero.
pub fn deal_column_total(column: &BoardColumn<DealStage, Deal>) -> f64 {
  column
    .items
    .iter()
    .filter_map(|deal| parse_amount(&deal.amount))
    .sum()
}

fn parse_amount(amount: &str) -> Option<f64> {
  let digits: String = amount
    .chars()
    .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
    .collect();
  digits.parse().ok()
}
