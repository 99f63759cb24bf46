use crate::screening::catalog::TrialType;
use crate::screening::schema::{
    fields_for, FieldSpec, FieldType, OptionSpec, OptionValue, ResponseDisposition, SchemaResolver,
};

#[test]
fn deserializes_plain_and_pair_options_from_the_wire() {
    let json = r#"
        [
            {"name": "gender", "type": "select", "label": "Gender",
             "options": ["Male", "Female"], "required": true},
            {"name": "has_aura", "type": "select", "label": "Has Aura",
             "options": [{"value": 0, "label": "No"}, {"value": 1, "label": "Yes"}],
             "required": true}
        ]
    "#;
    let fields: Vec<FieldSpec> = serde_json::from_str(json).expect("wire schema parses");

    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].field_type, FieldType::Select);
    assert_eq!(
        fields[0].options.as_deref(),
        Some(
            &[
                OptionSpec::Plain("Male".to_string()),
                OptionSpec::Plain("Female".to_string()),
            ][..]
        )
    );
    match &fields[1].options.as_deref().expect("options present")[1] {
        OptionSpec::Pair { value, label } => {
            assert_eq!(value, &OptionValue::Number(1.0));
            assert_eq!(label, "Yes");
        }
        other => panic!("expected a value/label pair, got {other:?}"),
    }
}

#[test]
fn deserializes_number_fields_with_bounds_and_step() {
    let json = r#"{"name": "bmi", "type": "number", "label": "BMI",
                   "min": 10, "max": 60, "step": 0.1, "required": true}"#;
    let field: FieldSpec = serde_json::from_str(json).expect("field parses");

    assert_eq!(field.field_type, FieldType::Number);
    assert_eq!(field.min, Some(10.0));
    assert_eq!(field.max, Some(60.0));
    assert_eq!(field.step, Some(0.1));
    assert!(field.required);
}

#[test]
fn absent_bounds_stay_off_the_wire() {
    let field = FieldSpec {
        name: "notes".to_string(),
        label: "Notes".to_string(),
        field_type: FieldType::Text,
        required: false,
        min: None,
        max: None,
        step: None,
        options: None,
    };
    let json = serde_json::to_string(&field).expect("serializes");
    assert!(!json.contains("min"));
    assert!(!json.contains("options"));
}

#[test]
fn canonical_tables_keep_schema_order() {
    let fields = fields_for(TrialType::Hypertension);
    let names: Vec<&str> = fields.iter().map(|field| field.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "age",
            "gender",
            "bmi",
            "glucose",
            "lifestyle_risk",
            "stress_level",
            "systolic_bp",
            "diastolic_bp",
            "cholesterol_total",
            "comorbidities",
            "consent",
        ]
    );
    assert!(fields.iter().all(|field| field.required));
}

#[test]
fn resolver_applies_only_the_newest_request() {
    let mut resolver = SchemaResolver::default();
    let first = resolver.begin(TrialType::Hypertension);
    let second = resolver.begin(TrialType::Migraine);

    // The superseded response lands late and must not overwrite anything.
    assert_eq!(
        resolver.apply(first, fields_for(TrialType::Hypertension)),
        ResponseDisposition::Discarded
    );
    assert_eq!(resolver.schema(), None);

    assert_eq!(
        resolver.apply(second, fields_for(TrialType::Migraine)),
        ResponseDisposition::Applied
    );
    assert_eq!(resolver.trial(), Some(TrialType::Migraine));
}

#[test]
fn invalidate_orphans_an_in_flight_request() {
    let mut resolver = SchemaResolver::default();
    let ticket = resolver.begin(TrialType::Arthritis);
    resolver.invalidate();

    assert_eq!(
        resolver.apply(ticket, fields_for(TrialType::Arthritis)),
        ResponseDisposition::Discarded
    );
    assert_eq!(resolver.trial(), None);
}
