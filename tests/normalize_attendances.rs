use mobilize_melt::normalize::batch::{
    ATTENDANCES, CUSTOM_SIGNUP_FIELDS, EVENTS, ORGANIZATIONS, PEOPLE, TIMESLOTS,
};
use mobilize_melt::normalize::{
    flatten, flatten_person, normalize, with_wfp_id, Collection, CsvSink, NormalizedBatch,
    Record, Targets, WFP_ID,
};
use mobilize_melt::normalize_attendances;
use serde_json::{json, Value};

const ATTENDANCE: &str = include_str!("fixtures/attendance.json");
const NEWER_ATTENDANCE: &str = include_str!("fixtures/newer_attendance.json");
const ATTENDANCE_NULL_IDS: &str = include_str!("fixtures/attendance_null_ids.json");

fn load(fixture: &str) -> Record {
    serde_json::from_str(fixture).unwrap()
}

#[derive(Default)]
struct Collections {
    organizations: Collection,
    timeslots: Collection,
    events: Collection,
    people: Collection,
    custom_signup_field_values: Vec<Record>,
}

impl Collections {
    fn normalize(&mut self, attendance: &Record) -> Record {
        let mut targets = Targets {
            organizations: &mut self.organizations,
            timeslots: Some(&mut self.timeslots),
            events: Some(&mut self.events),
            people: Some(&mut self.people),
            custom_signup_field_values: Some(&mut self.custom_signup_field_values),
        };
        normalize(attendance, &mut targets).unwrap()
    }
}

#[test]
fn normalizes_every_embedded_object() {
    let mut collections = Collections::default();
    let attendance = with_wfp_id(&load(ATTENDANCE));

    let normalized = collections.normalize(&attendance);

    assert_eq!(collections.timeslots.len(), 1);
    assert!(collections.timeslots.get_by_id(&json!(541134)).is_some());
    assert_eq!(collections.events.len(), 1);
    assert_eq!(collections.people.len(), 1);
    assert!(collections.people.get_by_id(&json!(467354)).is_some());
    assert_eq!(collections.organizations.len(), 2);

    // outer sponsor first, then the event's sponsor
    let organization_ids: Vec<&Value> = collections
        .organizations
        .iter()
        .map(|organization| &organization["id"])
        .collect();
    assert_eq!(organization_ids, vec![&json!(1391), &json!(1392)]);

    assert_eq!(collections.custom_signup_field_values.len(), 1);
    assert_eq!(
        Value::Object(collections.custom_signup_field_values[0].clone()),
        json!({
            "attendance_wfp_id": attendance[WFP_ID],
            "text_value": "Yes We Can Working Families",
            "custom_field_name": "Organization",
            "custom_field_id": 51,
            "boolean_value": null
        })
    );

    for key in ["event", "timeslot", "person", "sponsor"] {
        assert!(!normalized.contains_key(key), "{} should be extracted", key);
        assert!(normalized.contains_key(&format!("{}_wfp_id", key)));
    }
    assert!(!normalized.contains_key("custom_signup_field_values"));

    let event = collections.events.get_by_id(&json!(91154)).unwrap();
    let event_sponsor = collections.organizations.get_by_id(&json!(1392)).unwrap();
    assert_eq!(normalized["event_wfp_id"], event[WFP_ID]);
    assert_eq!(event["sponsor_wfp_id"], event_sponsor[WFP_ID]);
    assert!(!event.contains_key("sponsor"));
    assert_eq!(event["location_address_lines"], "line_1, line_2");
    assert_eq!(event["contact_owner_user_id"], 474960);

    let person = collections.people.get_by_id(&json!(467354)).unwrap();
    assert_eq!(normalized["person_wfp_id"], person[WFP_ID]);
    assert_eq!(person["email_address"], "enialis.liadon@example.com");
    assert_eq!(person["phone_number"], "5555555555");
    assert_eq!(person["postal_code"], "10031");

    // fields that were not extracted stay as they were
    assert_eq!(normalized["referrer"], attendance["referrer"]);
    assert_eq!(normalized[WFP_ID], attendance[WFP_ID]);
}

#[test]
fn records_without_natural_ids_are_kept() {
    let mut collections = Collections::default();
    let attendance = with_wfp_id(&load(ATTENDANCE_NULL_IDS));

    let normalized = collections.normalize(&attendance);

    assert_eq!(collections.timeslots.len(), 1);
    assert_eq!(collections.events.len(), 1);
    assert_eq!(collections.people.len(), 1);
    assert_eq!(collections.organizations.len(), 1);
    assert!(collections.custom_signup_field_values.is_empty());

    for key in ["event", "timeslot", "person", "sponsor"] {
        assert!(!normalized.contains_key(key));
        assert!(normalized.contains_key(&format!("{}_wfp_id", key)));
    }

    // the event's null sponsor is left alone
    let event = &collections.events.records()[0];
    assert_eq!(event["sponsor"], Value::Null);
    assert!(!event.contains_key("sponsor_wfp_id"));
    assert_eq!(event["id"], Value::Null);
}

#[test]
fn more_recently_modified_records_replace_older_ones() {
    let mut collections = Collections::default();
    collections.normalize(&with_wfp_id(&load(ATTENDANCE)));
    collections.normalize(&with_wfp_id(&load(NEWER_ATTENDANCE)));

    assert_eq!(collections.timeslots.len(), 1);
    assert_eq!(collections.events.len(), 1);
    assert_eq!(collections.people.len(), 1);
    assert_eq!(collections.organizations.len(), 2);
    assert_eq!(collections.custom_signup_field_values.len(), 2);

    // the event's sponsor was modified later and wins
    let event_sponsor = collections.organizations.get_by_id(&json!(1392)).unwrap();
    assert_eq!(event_sponsor["modified_date"], 1657227399);

    // the event itself has the same modified_date, so the first one stays
    let event = collections.events.get_by_id(&json!(91154)).unwrap();
    assert_eq!(event["location_address_lines"], "line_1, line_2");
    assert_eq!(event["location_location_latitude"], 1.0);
}

#[test]
fn flattens_an_event() {
    let attendance = load(ATTENDANCE);
    let event = attendance["event"].as_object().unwrap();

    let flat = flatten(event, "");

    assert_eq!(flat.len(), 53);
    assert!(flat.values().all(|value| !value.is_object() && !value.is_array()));
    assert_eq!(flat["contact_email_address"], "laucian.meliamne@example.com");
    assert_eq!(flat["location_location_longitude"], 2.0);
    assert_eq!(flat["location_address_lines"], "line_1, line_2");
    assert_eq!(flat["sponsor_slug"], "fake_workingfamilies");
    assert_eq!(flat["tags"], Value::Null);
    assert_eq!(flat["timeslots"], Value::Null);
}

#[test]
fn flattens_a_person() {
    let attendance = load(ATTENDANCE);
    let person = attendance["person"].as_object().unwrap();

    let flat = flatten_person(person, "").unwrap();

    assert_eq!(
        Value::Object(flat),
        json!({
            "blocked_date": null,
            "created_date": 1554167964,
            "email_address": "enialis.liadon@example.com",
            "family_name": "Liadon",
            "given_name": "Enialis",
            "id": 467354,
            "modified_date": 1664202529,
            "person_id": 467354,
            "phone_number": "5555555555",
            "postal_code": "10031",
            "sms_opt_in_status": "OPT_IN",
            "user_id": 474960
        })
    );
}

#[test]
fn batch_deduplicates_across_attendances() {
    let mut batch = NormalizedBatch::new();
    let attendances = vec![
        load(ATTENDANCE),
        load(NEWER_ATTENDANCE),
        load(ATTENDANCE_NULL_IDS),
    ];

    batch.extend(&attendances).unwrap();

    let summary = batch.summary();
    // records without an id are never merged with anything
    assert_eq!(summary.attendances, 2);
    assert_eq!(summary.events, 2);
    assert_eq!(summary.timeslots, 2);
    assert_eq!(summary.people, 2);
    assert_eq!(summary.organizations, 2);
    assert_eq!(summary.custom_signup_field_values, 2);

    for attendance in batch.attendances.iter() {
        assert!(attendance
            .values()
            .all(|value| !value.is_object() && !value.is_array()));
    }
}

#[test]
fn writes_one_csv_per_collection() {
    let dir = tempfile::tempdir().unwrap();
    let input = format!("[{}, {}]", ATTENDANCE, ATTENDANCE_NULL_IDS);
    let mut sink = CsvSink::new(dir.path()).unwrap();

    normalize_attendances(input.as_bytes(), &mut sink).unwrap();

    for name in [ATTENDANCES, TIMESLOTS, EVENTS, PEOPLE, ORGANIZATIONS, CUSTOM_SIGNUP_FIELDS] {
        assert!(dir.path().join(format!("{}.csv", name)).exists(), "{} missing", name);
    }

    let organizations = std::fs::read_to_string(dir.path().join("organizations.csv")).unwrap();
    let mut lines = organizations.lines();
    let header: Vec<&str> = lines.next().unwrap().split(',').collect();
    let mut sorted = header.clone();
    sorted.sort_unstable();
    assert_eq!(header, sorted);
    assert!(header.contains(&"wfp_id"));
    assert_eq!(lines.count(), 2);

    let custom = std::fs::read_to_string(dir.path().join("custom_signup_fields.csv")).unwrap();
    assert!(custom.starts_with("attendance_wfp_id,boolean_value,custom_field_id,custom_field_name,text_value\n"));
}
