use super::catalog::TrialType;
use super::schema::fields_for;

/// Example data row shipped with each template, one cell per schema field.
fn example_row(trial: TrialType) -> &'static [&'static str] {
    match trial {
        TrialType::Hypertension => &[
            "45", "Male", "26.5", "95", "1", "7", "140", "85", "220", "1", "Yes",
        ],
        TrialType::Arthritis => &["55", "5.2", "8", "6", "15.3", "7", "75.5", "1", "0"],
        TrialType::Migraine => &["35", "8", "2", "25.5", "1", "0", "0", "1", "0", "3"],
        TrialType::Phase1 => &[
            "28", "0", "70.5", "175.0", "23.0", "1", "22.3", "0.9", "120", "80", "72", "36.5", "0",
        ],
    }
}

/// Ordered column headers the server-side bulk parser depends on; identical
/// to the field order of the trial's schema.
pub fn template_columns(trial: TrialType) -> Vec<String> {
    fields_for(trial)
        .into_iter()
        .map(|field| field.name)
        .collect()
}

/// CSV template for a trial type: the header line plus one example row.
pub fn template_csv(trial: TrialType) -> String {
    let columns = template_columns(trial);
    let example = example_row(trial);
    debug_assert_eq!(columns.len(), example.len());

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&columns)
        .expect("writing to an in-memory buffer cannot fail");
    writer
        .write_record(example)
        .expect("writing to an in-memory buffer cannot fail");
    let bytes = writer
        .into_inner()
        .expect("writing to an in-memory buffer cannot fail");
    String::from_utf8(bytes).expect("templates are valid UTF-8")
}

/// Suggested download name for a trial's template.
pub fn template_file_name(trial: TrialType) -> String {
    format!("{}_template.csv", trial.tag())
}
