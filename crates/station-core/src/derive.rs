//! Record-level derived fields and the live-edit path that keeps them consistent.

use station_domain::{
    canonical_category_tag, Amounted, DailyRecord, ExpenditureLine, Loan, NozzleReading,
};

use crate::CoreError;

/// Sum of line amounts, treating absent amounts as zero.
///
/// Both the edit path and the aggregation path call this; the stored
/// `total_expenditure` field is never read back as a source.
pub fn total_expenditure(lines: &[ExpenditureLine]) -> f64 {
    lines.iter().map(Amounted::amount).sum()
}

/// Stateless helpers that recompute derived record fields.
pub struct DerivationService;

impl DerivationService {
    /// Returns a copy of `record` with derived fields recomputed.
    pub fn derive_totals(record: &DailyRecord) -> DailyRecord {
        let mut derived = record.clone();
        Self::apply(&mut derived);
        derived
    }

    /// Recomputes derived fields in place.
    pub fn apply(record: &mut DailyRecord) {
        record.total_expenditure = Some(total_expenditure(&record.expenditures));
    }

    /// Fills an undeclared net sale as CNG sale plus other revenue minus expenditure.
    /// A declared net sale is left untouched.
    pub fn fill_net_sale(record: &mut DailyRecord) {
        if record.net_sale.is_some() {
            return;
        }
        let Some(cng_sale) = record.total_cng_sale else {
            return;
        };
        let revenue = cng_sale + record.other_revenue.unwrap_or(0.0);
        record.net_sale = Some(revenue - total_expenditure(&record.expenditures));
    }

    pub fn remaining_loan_amount(loan: &Loan) -> f64 {
        loan.remaining_loan_amount()
    }

    /// Sets a line's category tag. A changed category clears the subcategory,
    /// since subcategories are only legal within their own category.
    pub fn set_line_category(line: &mut ExpenditureLine, category: Option<&str>) {
        let next = category.and_then(canonical_category_tag);
        if next != canonical(&line.category) {
            line.subcategory = None;
        }
        line.category = next;
    }
}

/// Owns a record during an edit session and re-derives totals after every mutation.
#[derive(Debug, Clone)]
pub struct RecordEditor {
    record: DailyRecord,
}

impl RecordEditor {
    pub fn new(mut record: DailyRecord) -> Self {
        DerivationService::apply(&mut record);
        Self { record }
    }

    pub fn record(&self) -> &DailyRecord {
        &self.record
    }

    pub fn into_record(self) -> DailyRecord {
        self.record
    }

    pub fn total_expenditure(&self) -> f64 {
        self.record.total_expenditure.unwrap_or(0.0)
    }

    pub fn add_line(&mut self, line: ExpenditureLine) -> usize {
        self.record.expenditures.push(line);
        self.refresh();
        self.record.expenditures.len() - 1
    }

    /// Applies `f` to one line. If `f` changes the category but leaves the old
    /// subcategory in place, the subcategory is cleared.
    pub fn update_line<F>(&mut self, index: usize, f: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut ExpenditureLine),
    {
        let line = self
            .record
            .expenditures
            .get_mut(index)
            .ok_or(CoreError::LineNotFound(index))?;
        let before_category = line.category.clone();
        let before_subcategory = line.subcategory.clone();
        f(line);
        let category_changed = canonical(&line.category) != canonical(&before_category);
        if category_changed && line.subcategory == before_subcategory {
            line.subcategory = None;
        }
        self.refresh();
        Ok(())
    }

    pub fn set_line_category(&mut self, index: usize, category: Option<&str>) -> Result<(), CoreError> {
        let line = self
            .record
            .expenditures
            .get_mut(index)
            .ok_or(CoreError::LineNotFound(index))?;
        DerivationService::set_line_category(line, category);
        self.refresh();
        Ok(())
    }

    pub fn set_line_subcategory(
        &mut self,
        index: usize,
        subcategory: Option<&str>,
    ) -> Result<(), CoreError> {
        self.update_line(index, |line| {
            line.subcategory = subcategory
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string);
        })
    }

    pub fn set_line_amount(&mut self, index: usize, amount: Option<f64>) -> Result<(), CoreError> {
        self.update_line(index, |line| line.amount = amount)
    }

    pub fn remove_line(&mut self, index: usize) -> Result<ExpenditureLine, CoreError> {
        if index >= self.record.expenditures.len() {
            return Err(CoreError::LineNotFound(index));
        }
        let removed = self.record.expenditures.remove(index);
        self.refresh();
        Ok(removed)
    }

    /// Full replace of the expenditure collection, as done by the edit workflow.
    pub fn replace_lines(&mut self, lines: Vec<ExpenditureLine>) {
        self.record.expenditures = lines;
        self.refresh();
    }

    pub fn add_nozzle(&mut self, reading: NozzleReading) -> usize {
        self.record.nozzle_readings.push(reading);
        self.record.nozzle_readings.len() - 1
    }

    pub fn update_nozzle<F>(&mut self, index: usize, f: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut NozzleReading),
    {
        let reading = self
            .record
            .nozzle_readings
            .get_mut(index)
            .ok_or(CoreError::NozzleNotFound(index))?;
        f(reading);
        Ok(())
    }

    pub fn remove_nozzle(&mut self, index: usize) -> Result<NozzleReading, CoreError> {
        if index >= self.record.nozzle_readings.len() {
            return Err(CoreError::NozzleNotFound(index));
        }
        Ok(self.record.nozzle_readings.remove(index))
    }

    pub fn replace_nozzles(&mut self, readings: Vec<NozzleReading>) {
        self.record.nozzle_readings = readings;
    }

    fn refresh(&mut self) {
        DerivationService::apply(&mut self.record);
    }
}

fn canonical(tag: &Option<String>) -> Option<String> {
    tag.as_deref().and_then(canonical_category_tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use station_domain::ExpenditureCategory;

    fn record() -> DailyRecord {
        DailyRecord::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 1)
    }

    #[test]
    fn derive_totals_ignores_stale_stored_total() {
        let mut stale = record()
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::Kitchen, 200.0))
            .with_expenditure(ExpenditureLine::default().with_description("unpriced"));
        stale.total_expenditure = Some(9_999.0);
        let derived = DerivationService::derive_totals(&stale);
        assert_eq!(derived.total_expenditure, Some(200.0));
        assert_eq!(stale.total_expenditure, Some(9_999.0));
    }

    #[test]
    fn changing_category_clears_subcategory() {
        let mut line =
            ExpenditureLine::new(ExpenditureCategory::Kitchen, 50.0).with_subcategory("utensils");
        DerivationService::set_line_category(&mut line, Some("general"));
        assert_eq!(line.category.as_deref(), Some("general"));
        assert_eq!(line.subcategory, None);
    }

    #[test]
    fn same_category_keeps_subcategory() {
        let mut line =
            ExpenditureLine::new(ExpenditureCategory::Kitchen, 50.0).with_subcategory("utensils");
        DerivationService::set_line_category(&mut line, Some("Kitchen"));
        assert_eq!(line.subcategory.as_deref(), Some("utensils"));
    }

    #[test]
    fn editor_and_update_line_agree_on_legacy_casing() {
        let stored: DailyRecord = serde_json::from_str(
            r#"{"date": "2024-01-05", "stationId": 1,
                "expenditures": [{"category": "Kitchen", "subcategory": "utensils", "amount": 75}]}"#,
        )
        .unwrap();

        let mut by_setter = RecordEditor::new(stored.clone());
        by_setter.set_line_category(0, Some("kitchen")).unwrap();
        let mut by_update = RecordEditor::new(stored);
        by_update
            .update_line(0, |line| line.category = Some("kitchen".into()))
            .unwrap();

        let set_line = &by_setter.record().expenditures[0];
        assert_eq!(set_line.category.as_deref(), Some("kitchen"));
        assert_eq!(set_line.subcategory.as_deref(), Some("utensils"));
        assert_eq!(
            set_line.subcategory,
            by_update.record().expenditures[0].subcategory
        );
        assert_eq!(by_setter.total_expenditure(), 75.0);
    }

    #[test]
    fn editor_rederives_after_each_mutation() {
        let mut editor = RecordEditor::new(record());
        let first = editor.add_line(ExpenditureLine::new(ExpenditureCategory::Kitchen, 100.0));
        editor.add_line(ExpenditureLine::new(ExpenditureCategory::Salary, 400.0));
        assert_eq!(editor.total_expenditure(), 500.0);

        editor.set_line_amount(first, Some(150.0)).unwrap();
        assert_eq!(editor.total_expenditure(), 550.0);

        editor.remove_line(1).unwrap();
        assert_eq!(editor.total_expenditure(), 150.0);

        assert!(matches!(
            editor.remove_line(5),
            Err(CoreError::LineNotFound(5))
        ));
    }

    #[test]
    fn update_line_clears_stale_subcategory_on_category_change() {
        let mut editor = RecordEditor::new(record().with_expenditure(
            ExpenditureLine::new(ExpenditureCategory::Kitchen, 80.0).with_subcategory("water"),
        ));
        editor
            .update_line(0, |line| line.category = Some("general".into()))
            .unwrap();
        assert_eq!(editor.record().expenditures[0].subcategory, None);

        editor
            .update_line(0, |line| {
                line.category = Some("kitchen".into());
                line.subcategory = Some("groceries".into());
            })
            .unwrap();
        assert_eq!(
            editor.record().expenditures[0].subcategory.as_deref(),
            Some("groceries")
        );
    }

    #[test]
    fn net_sale_is_filled_only_when_undeclared() {
        let mut open = record();
        open.total_cng_sale = Some(10_000.0);
        open.other_revenue = Some(500.0);
        open.expenditures
            .push(ExpenditureLine::new(ExpenditureCategory::General, 1_500.0));
        DerivationService::fill_net_sale(&mut open);
        assert_eq!(open.net_sale, Some(9_000.0));

        let mut declared = open.clone();
        declared.net_sale = Some(1.0);
        DerivationService::fill_net_sale(&mut declared);
        assert_eq!(declared.net_sale, Some(1.0));
    }
}
