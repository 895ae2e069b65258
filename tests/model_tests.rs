mod common;

use adwatch::models::{AlertRecord, Frequency, PersistedUpdate, PollResult, WatchEvent};
use common::{alert, draft};
use mongodb::bson::oid::ObjectId;
use serde_json::json;

#[test]
fn frequency_parses_names_and_minutes() {
    assert_eq!("hourly".parse::<Frequency>().unwrap(), Frequency::Hourly);
    assert_eq!(" Daily ".parse::<Frequency>().unwrap(), Frequency::Daily);
    assert_eq!("weekly".parse::<Frequency>().unwrap(), Frequency::Weekly);
    assert_eq!("15".parse::<Frequency>().unwrap(), Frequency::every_minutes(15).unwrap());
    assert_eq!("30m".parse::<Frequency>().unwrap(), Frequency::every_minutes(30).unwrap());

    assert!("0".parse::<Frequency>().is_err());
    assert!("monthly".parse::<Frequency>().is_err());
    assert!("".parse::<Frequency>().is_err());
}

#[test]
fn frequency_serializes_as_name_or_number() {
    assert_eq!(serde_json::to_value(Frequency::Hourly).unwrap(), json!("hourly"));
    assert_eq!(serde_json::to_value(Frequency::every_minutes(5).unwrap()).unwrap(), json!(5));

    let f: Frequency = serde_json::from_value(json!(10)).unwrap();
    assert_eq!(f, Frequency::every_minutes(10).unwrap());
    let f: Frequency = serde_json::from_value(json!("weekly")).unwrap();
    assert_eq!(f, Frequency::Weekly);

    assert!(serde_json::from_value::<Frequency>(json!(0)).is_err());
    assert!(serde_json::from_value::<Frequency>(json!("fortnightly")).is_err());
}

#[test]
fn frequency_labels_read_naturally() {
    assert_eq!(Frequency::every_minutes(1).unwrap().label(), "every minute");
    assert_eq!(Frequency::every_minutes(20).unwrap().label(), "every 20 minutes");
    assert_eq!(Frequency::Daily.label(), "daily");
}

#[test]
fn valid_draft_is_trimmed() {
    let mut d = draft("  bike  ", Frequency::Hourly);
    d.email = " watcher@example.com ".to_string();

    let ok = d.validate().unwrap();
    assert_eq!(ok.subject, "bike");
    assert_eq!(ok.email, "watcher@example.com");
}

#[test]
fn invalid_draft_reports_every_bad_field() {
    let mut d = draft("", Frequency::Hourly);
    d.email = "not-an-email".to_string();
    d.url = "ftp://ads.example.com".to_string();
    d.advertisement = "   ".to_string();

    let errs = d.validate().unwrap_err();
    let fields: Vec<&str> = errs.iter().map(|(f, _)| *f).collect();
    assert_eq!(fields, vec!["subject", "advertisement", "email", "url"]);
}

#[test]
fn subject_must_be_a_single_line() {
    for bad in ["bike\rsale", "bike\nsale", "bike\u{7}"] {
        let d = draft(bad, Frequency::Hourly);
        let errs = d.validate().unwrap_err();
        assert_eq!(errs.len(), 1, "{bad:?}");
        assert_eq!(errs[0].0, "subject");
    }
}

#[test]
fn advertisement_id_must_be_one_path_segment() {
    let rejected = [
        "../../admin/users",
        "ad-1?delete=true",
        "ad#frag",
        "..",
        ".",
        "ad 1",
        "ad%2F1",
        "ad\\1",
        "ad\r1",
    ];
    for bad in rejected {
        let mut d = draft("bike", Frequency::Hourly);
        d.advertisement = bad.to_string();
        let errs = d.validate().unwrap_err();
        assert_eq!(errs.len(), 1, "{bad:?}");
        assert_eq!(errs[0].0, "advertisement");
    }

    for good in ["ad-42", "AD_7.v2", "123456"] {
        let mut d = draft("bike", Frequency::Hourly);
        d.advertisement = good.to_string();
        assert!(d.validate().is_ok(), "{good:?}");
    }
}

#[test]
fn draft_bounds_must_be_ordered_and_non_negative() {
    let mut d = draft("bike", Frequency::Hourly);
    d.min = 200.0;
    d.max = 100.0;
    let errs = d.validate().unwrap_err();
    assert_eq!(errs[0].0, "max");

    let mut d = draft("bike", Frequency::Hourly);
    d.min = -1.0;
    assert_eq!(d.validate().unwrap_err()[0].0, "min");

    let mut d = draft("bike", Frequency::Hourly);
    d.max = f64::NAN;
    assert_eq!(d.validate().unwrap_err()[0].0, "min");

    let mut d = draft("bike", Frequency::Hourly);
    d.min = 100.0;
    d.max = 100.0;
    assert!(d.validate().is_ok());
}

#[test]
fn alert_record_round_trips_its_draft() {
    let user = ObjectId::new();
    let d = draft("bike", Frequency::Daily);
    let a = AlertRecord::from_draft(ObjectId::new(), user, d.clone(), 42);

    assert_eq!(a.user_id, user);
    assert_eq!(a.created_at, 42);
    assert_eq!(a.to_draft(), d);
}

#[test]
fn poll_result_matches_inside_bounds_only() {
    let a = alert(ObjectId::new(), "bike", Frequency::Hourly);

    assert!(PollResult::for_alert(&a, 0.0, true, 1).matches());
    assert!(PollResult::for_alert(&a, 1000.0, true, 1).matches());
    assert!(!PollResult::for_alert(&a, 1000.01, true, 1).matches());
    assert!(!PollResult::for_alert(&a, 500.0, false, 1).matches());
    assert!(!PollResult::for_alert(&a, f64::NAN, true, 1).matches());
}

#[test]
fn persisted_update_keeps_the_match_and_describes_itself() {
    let a = alert(ObjectId::new(), "bike", Frequency::Hourly);

    let seen = PersistedUpdate::from_poll(ObjectId::new(), PollResult::for_alert(&a, 12.5, true, 7), 9);
    assert!(seen.matched);
    assert_eq!(seen.alert_id, a.id);
    assert_eq!(seen.observed_at, 7);
    assert_eq!(seen.saved_at, 9);
    assert_eq!(seen.message(), "bike: advertisement ad-42 is at 12.50");

    let gone = PersistedUpdate::from_poll(ObjectId::new(), PollResult::for_alert(&a, 12.5, false, 7), 9);
    assert!(!gone.matched);
    assert_eq!(gone.message(), "bike: advertisement ad-42 is no longer available");
}

#[test]
fn watch_events_carry_a_name_and_hide_the_user() {
    let user = ObjectId::new();
    let evt = WatchEvent::AlertsUpdated { user_id: user, count: 3 };

    assert_eq!(evt.name(), "alertsUpdated");
    assert_eq!(evt.user_id(), user);
    assert_eq!(serde_json::to_value(&evt).unwrap(), json!({ "type": "alertsUpdated", "count": 3 }));

    let err = WatchEvent::Error {
        user_id: user,
        message: "boom".to_string(),
    };
    assert_eq!(err.name(), "watchError");
}
