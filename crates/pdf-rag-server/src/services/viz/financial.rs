/// Financial statement kinds the pipeline recognizes in retrieved context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    TrialBalance,
    ProfitAndLoss,
    BalanceSheet,
    CashFlow,
}

/// Keyword heuristic over the retrieved context; first match wins.
pub fn detect(context: &str) -> Option<StatementKind> {
    let lowered = context.to_lowercase();

    if lowered.contains("trial balance") {
        return Some(StatementKind::TrialBalance);
    }
    if lowered.contains("profit and loss")
        || lowered.contains("income statement")
        || lowered.contains("p&l")
    {
        return Some(StatementKind::ProfitAndLoss);
    }
    if lowered.contains("balance sheet") {
        return Some(StatementKind::BalanceSheet);
    }
    if lowered.contains("cash flow") {
        return Some(StatementKind::CashFlow);
    }
    None
}

/// Domain mapping applied before validation: each statement kind has a
/// canonical chart shape.
pub fn preferred_chart(kind: StatementKind) -> &'static str {
    match kind {
        StatementKind::TrialBalance => "stacked_bar",
        StatementKind::ProfitAndLoss => "bar",
        StatementKind::BalanceSheet => "pie",
        StatementKind::CashFlow => "line",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_each_statement_kind() {
        assert_eq!(
            detect("Trial Balance as of December 31"),
            Some(StatementKind::TrialBalance)
        );
        assert_eq!(
            detect("Consolidated income statement for FY24"),
            Some(StatementKind::ProfitAndLoss)
        );
        assert_eq!(detect("BALANCE SHEET"), Some(StatementKind::BalanceSheet));
        assert_eq!(
            detect("statement of cash flows / cash flow from operations"),
            Some(StatementKind::CashFlow)
        );
        assert_eq!(detect("quarterly revenue narrative"), None);
    }

    #[test]
    fn trial_balance_outranks_balance_sheet_wording() {
        let context = "trial balance reconciled against the balance sheet";
        assert_eq!(detect(context), Some(StatementKind::TrialBalance));
    }

    #[test]
    fn kinds_map_to_their_chart_shapes() {
        assert_eq!(preferred_chart(StatementKind::TrialBalance), "stacked_bar");
        assert_eq!(preferred_chart(StatementKind::ProfitAndLoss), "bar");
        assert_eq!(preferred_chart(StatementKind::BalanceSheet), "pie");
        assert_eq!(preferred_chart(StatementKind::CashFlow), "line");
    }
}
