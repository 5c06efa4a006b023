use exclusivity_lib::sources::evidence_source::{DirectoryEvidence, JsonEvidence, NoEvidence};
use exclusivity_lib::sources::output::{write_pipeline_output, OutputFormat};
use exclusivity_lib::sources::records::{load_brands, load_generics};
use exclusivity_lib::{
    run_matching_pipeline, ApprovalDate, BrandApplication, GenericApplication, PipelineOutput,
    UnmatchedReason, ValidationPolicy, ValidationStatus,
};
use chrono::NaiveDate;
use std::fs;
use std::path::Path;

const BRANDS_CSV: &str = "\
application_number,ingredient,strength,dosage_form,route,approval_date,exclusivity_years,companies
020702,Atorvastatin Calcium,10MG,TABLET,ORAL,1996-12-17,5,Pfizer Inc
020702,Atorvastatin Calcium,20MG,TABLET,ORAL,1996-12-17,5,Parke Davis Div Warner Lambert Co
019766,Simvastatin,5MG | 10MG,TABLET,ORAL,12/23/1991,3,Merck And Co Inc
017000,Warfarin Sodium,5MG,TABLET,ORAL,\"Approved Prior to Jan 1, 1982\",,Bristol Myers Squibb Co
021445,Ezetimibe,10MG,TABLET,ORAL,2002-10-25,5,MSP Singapore Co LLC
";

const GENERICS_JSON: &str = r#"[
    {"appl_no": "076477", "ingredient": "ATORVASTATIN CALCIUM", "strength": "10MG",
     "df;route": "TABLET;ORAL", "approval_date": "2011-11-30", "applicant": "RANBAXY",
     "te_code": "AB"},
    {"appl_no": "078773", "ingredient": "ATORVASTATIN CALCIUM", "strength": "20MG",
     "dosage_form": "TABLET, FILM COATED", "route": "ORAL", "approval_date": "2012-05-29",
     "applicant": "SANDOZ"},
    {"appl_no": "090001", "ingredient": "Atorvastatin Calcium", "strength": "40MG",
     "dosage_form": "TABLET", "route": "ORAL", "approval_date": "2012-06-01",
     "applicant": "APOTEX"},
    {"appl_no": "074000", "ingredient": "SIMVASTATIN", "strength": "10MG",
     "dosage_form": "TABLET", "route": "ORAL", "approval_date": "1990-06-01",
     "applicant": "EARLY LABS"},
    {"appl_no": "076285", "ingredient": "SIMVASTATIN", "strength": "5MG",
     "dosage_form": "TABLET", "route": "ORAL", "approval_date": "2006-06-23",
     "applicant": "TEVA"},
    {"appl_no": "088888", "ingredient": "WARFARIN SODIUM", "strength": "5MG",
     "dosage_form": "TABLET", "route": "ORAL", "approval_date": "1999-10-01",
     "applicant": "TARO"}
]"#;

const CONFIRMING_LETTER: &str = "\
Reference is made to your abbreviated new drug application.

The Office of Bioequivalence has determined your Atorvastatin Calcium Tablets, 10 mg,
to be bioequivalent and, therefore, therapeutically equivalent to the reference listed
drug, Lipitor Tablets, 10 mg, of Pfizer Inc.

Sincerely yours,
";

const CONTRADICTING_LETTER: &str = "\
The Office of Bioequivalence has determined your Atorvastatin Calcium Tablets, 20 mg,
to be bioequivalent and, therefore, therapeutically equivalent to the reference listed
drug, Caduet Tablets, of Sandoz Inc.
";

fn write_inputs(dir: &Path) -> (Vec<BrandApplication>, Vec<GenericApplication>) {
    let brands_path = dir.join("brands.csv");
    let generics_path = dir.join("generics.json");
    fs::write(&brands_path, BRANDS_CSV).unwrap();
    fs::write(&generics_path, GENERICS_JSON).unwrap();
    (
        load_brands(&brands_path).unwrap(),
        load_generics(&generics_path).unwrap(),
    )
}

const LETTER_WITHOUT_STATEMENT: &str = "\
This letter acknowledges your revised labeling for Simvastatin Tablets.

Sincerely yours,
";

fn evidence_dir(dir: &Path) -> DirectoryEvidence {
    let letters = dir.join("letters");
    fs::create_dir_all(&letters).unwrap();
    fs::write(letters.join("076477.txt"), CONFIRMING_LETTER).unwrap();
    fs::write(letters.join("ANDA078773.txt"), CONTRADICTING_LETTER).unwrap();
    fs::write(letters.join("076285.txt"), LETTER_WITHOUT_STATEMENT).unwrap();
    DirectoryEvidence::new(&letters).unwrap()
}

fn pairs(matches: &[exclusivity_lib::ValidatedMatch]) -> Vec<(&str, &str)> {
    matches
        .iter()
        .map(|m| (m.brand_application.as_str(), m.generic_application.as_str()))
        .collect()
}

fn assert_invariants(output: &PipelineOutput) {
    for m in output.retained.iter().chain(output.rejected.iter()) {
        if let (Some(brand), Some(generic)) = (m.brand_date(), m.generic_date()) {
            assert!(generic >= brand, "{:?} predates its brand", m);
        }
        assert!(m.dosage_form_compatible && m.route_compatible && m.strength_compatible);
    }
    for m in &output.rejected {
        assert!(m.reference_text.is_some(), "rejected without evidence: {:?}", m);
    }
    for m in &output.retained {
        assert_ne!(m.status, ValidationStatus::Rejected);
    }
}

#[test]
fn test_pipeline_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let (brands, generics) = write_inputs(dir.path());
    assert_eq!(brands.len(), 4);
    assert_eq!(generics.len(), 6);
    assert_eq!(brands[0].companies.len(), 2);
    assert_eq!(brands[0].strength, "10MG | 20MG");
    assert_eq!(brands[2].approval_date, Some(ApprovalDate::PriorToCutoff));

    let evidence = evidence_dir(dir.path());
    let output =
        run_matching_pipeline(&brands, &generics, &evidence, &ValidationPolicy::default(), None)
            .unwrap();
    assert_invariants(&output);

    assert_eq!(output.stats.candidate_pairs, 6);
    assert_eq!(output.stats.criteria_passed, 5);
    assert_eq!(output.stats.chronologically_excluded, 1);
    assert_eq!(
        pairs(&output.retained),
        vec![("017000", "088888"), ("019766", "076285"), ("020702", "076477")]
    );
    assert_eq!(pairs(&output.rejected), vec![("020702", "078773")]);

    let confirmed = &output.retained[2];
    assert_eq!(confirmed.status, ValidationStatus::Validated);
    assert_eq!(confirmed.matched_company.as_deref(), Some("Pfizer Inc"));
    assert_eq!(confirmed.generic_te_code.as_deref(), Some("AB"));
    assert_eq!(output.retained[0].status, ValidationStatus::Unknown);
    assert_eq!(output.retained[1].status, ValidationStatus::Unknown);

    assert_eq!(output.monopoly.len(), 3);
    let atorvastatin = output
        .monopoly
        .iter()
        .find(|r| r.brand_application == "020702")
        .unwrap();
    assert_eq!(atorvastatin.earliest_generic_application.as_deref(), Some("076477"));
    assert!((atorvastatin.actual_exclusivity_years.unwrap() - 14.9514).abs() < 1e-3);
    assert_eq!(atorvastatin.actual_shorter_than_granted, Some(false));
    assert_eq!(atorvastatin.matched_generics, vec!["076477"]);

    let warfarin = output
        .monopoly
        .iter()
        .find(|r| r.brand_application == "017000")
        .unwrap();
    assert_eq!(warfarin.actual_exclusivity_years, None);
    assert_eq!(warfarin.earliest_generic_date, None);
    assert_eq!(warfarin.matched_generics, vec!["088888"]);

    assert_eq!(output.unmatched.len(), 1);
    assert_eq!(output.unmatched[0].brand_application, "021445");
    assert_eq!(output.unmatched[0].reason, UnmatchedReason::NoCandidates);

    let letters: Vec<(&str, bool, bool)> = output
        .extraction_status
        .iter()
        .map(|s| (s.generic_application.as_str(), s.letter_found, s.statement_extracted))
        .collect();
    assert_eq!(
        letters,
        vec![
            ("076285", true, false),
            ("076477", true, true),
            ("078773", true, true),
            ("088888", false, false),
        ]
    );
    assert_eq!(output.stats.letters_found, 3);
    assert_eq!(output.stats.statements_extracted, 2);

    let out_dir = dir.path().join("out");
    let written = write_pipeline_output(&out_dir, &output, OutputFormat::Json).unwrap();
    assert_eq!(written.len(), 6);
    let monopoly: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("monopoly_records.json")).unwrap())
            .unwrap();
    assert_eq!(monopoly.as_array().unwrap().len(), 3);
    let stats: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("run_stats.json")).unwrap()).unwrap();
    assert_eq!(stats["rejected"], 1);
    assert_eq!(stats["validated"], 1);
    assert_eq!(stats["generics_looked_up"], 4);
}

#[test]
fn test_missing_evidence_never_rejects() {
    let dir = tempfile::tempdir().unwrap();
    let (brands, generics) = write_inputs(dir.path());

    let output =
        run_matching_pipeline(&brands, &generics, &NoEvidence, &ValidationPolicy::default(), None)
            .unwrap();
    assert_invariants(&output);
    assert!(output.rejected.is_empty());
    assert_eq!(output.retained.len(), 4);
    assert!(output
        .retained
        .iter()
        .all(|m| m.status == ValidationStatus::Unknown && m.matched_company.is_none()));
    assert_eq!(output.stats.letters_found, 0);
    assert!(output.extraction_status.iter().all(|s| !s.letter_found));
}

#[test]
fn test_identical_inputs_give_identical_results() {
    let dir = tempfile::tempdir().unwrap();
    let (brands, generics) = write_inputs(dir.path());
    let evidence = evidence_dir(dir.path());
    let policy = ValidationPolicy::default();

    let first = run_matching_pipeline(&brands, &generics, &evidence, &policy, None).unwrap();
    let second = run_matching_pipeline(&brands, &generics, &evidence, &policy, None).unwrap();
    assert_eq!(first.retained, second.retained);
    assert_eq!(first.rejected, second.rejected);
    assert_eq!(first.monopoly, second.monopoly);
    assert_eq!(first.unmatched, second.unmatched);
    assert_eq!(first.extraction_status, second.extraction_status);
    assert_ne!(first.stats.run_id, second.stats.run_id);
}

#[test]
fn test_json_evidence_and_csv_output() {
    let date = |y, m, d| Some(ApprovalDate::On(NaiveDate::from_ymd_opt(y, m, d).unwrap()));
    let brands = vec![BrandApplication {
        application_number: "021226".to_string(),
        ingredient: "LOPINAVIR; RITONAVIR".to_string(),
        strength: "200MG;50MG".to_string(),
        dosage_form: "TABLET".to_string(),
        route: "ORAL".to_string(),
        approval_date: date(2005, 10, 28),
        exclusivity_years: Some(15.0),
        companies: vec!["AbbVie Inc".to_string()],
        trade_name: Some("KALETRA".to_string()),
    }];
    let generics = vec![GenericApplication {
        application_number: "204187".to_string(),
        ingredient: "Lopinavir;  Ritonavir".to_string(),
        strength: "200MG;50MG".to_string(),
        dosage_form: "TABLET, FILM COATED".to_string(),
        route: "ORAL".to_string(),
        approval_date: date(2016, 11, 30),
        applicant: "HETERO LABS".to_string(),
        te_code: None,
        trade_name: None,
    }];
    let letters = serde_json::json!({
        "204187": "Your tablets are bioequivalent and therapeutically equivalent to the \
                   reference listed drug, Kaletra Tablets, of AbbVie Inc. Other text.",
        "999999": null
    });
    let evidence = JsonEvidence::parse(&letters.to_string()).unwrap();

    let output =
        run_matching_pipeline(&brands, &generics, &evidence, &ValidationPolicy::default(), None)
            .unwrap();
    assert_invariants(&output);
    assert_eq!(output.retained.len(), 1);
    assert_eq!(output.retained[0].status, ValidationStatus::Validated);
    assert_eq!(output.monopoly[0].actual_shorter_than_granted, Some(true));

    let dir = tempfile::tempdir().unwrap();
    write_pipeline_output(dir.path(), &output, OutputFormat::Csv).unwrap();
    let retained = fs::read_to_string(dir.path().join("retained_matches.csv")).unwrap();
    assert_eq!(retained.lines().count(), 2);
    assert!(retained.contains("204187"));
    assert!(retained.contains("Validated"));
    let rejected = fs::read_to_string(dir.path().join("rejected_matches.csv")).unwrap();
    assert_eq!(rejected.lines().count(), 1);
    assert!(rejected.starts_with("brand_application,"));
}
