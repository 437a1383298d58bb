//! Sleep session reconstruction
//!
//! Native stores hand back sleep as flat per-stage records. Records are grouped
//! by writing app and by the night they belong to, overlaps are clipped, and
//! each group becomes one [`SleepSession`] with per-stage totals.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::BridgeConfig;
use crate::store::RawSleepStage;
use crate::types::{seconds_between, SleepSession, SleepStage, SleepStageSample, TimeRange};
use crate::vocabulary::PlatformVocabulary;

/// Title used when no record carries one
pub const DEFAULT_SESSION_TITLE: &str = "Sleep";

pub struct SleepReconstructor<'a> {
    vocab: &'a dyn PlatformVocabulary,
    config: &'a BridgeConfig,
}

impl<'a> SleepReconstructor<'a> {
    pub fn new(vocab: &'a dyn PlatformVocabulary, config: &'a BridgeConfig) -> Self {
        Self { vocab, config }
    }

    /// Rebuild sessions from the stage records starting within `range`,
    /// sorted by session start.
    pub fn reconstruct(&self, records: Vec<RawSleepStage>, range: TimeRange) -> Vec<SleepSession> {
        let mut nights: BTreeMap<(String, NaiveDate), Vec<RawSleepStage>> = BTreeMap::new();
        for record in records {
            if record.end <= record.start
                || record.start < range.start
                || record.start >= range.end
            {
                continue;
            }
            let key = (record.source.bundle_id.clone(), self.night_of(record.start));
            nights.entry(key).or_default().push(record);
        }

        // A native session crossing the night boundary lands in several groups
        let mut native_groups: BTreeMap<String, usize> = BTreeMap::new();
        for records in nights.values() {
            if let Some(native) = shared_native_id(records) {
                *native_groups.entry(native.to_string()).or_default() += 1;
            }
        }

        let mut sessions: Vec<SleepSession> = nights
            .into_iter()
            .filter_map(|((bundle_id, night), records)| {
                self.build_session(&bundle_id, night, records, &native_groups)
            })
            .collect();
        sessions.sort_by_key(|session| session.start_date);
        sessions
    }

    /// Local day a stage starting at `instant` is attributed to
    fn night_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        let shift = Duration::hours(i64::from(self.config.sleep_day_boundary_hour));
        self.config.local_day(instant - shift)
    }

    fn build_session(
        &self,
        bundle_id: &str,
        night: NaiveDate,
        mut records: Vec<RawSleepStage>,
        native_groups: &BTreeMap<String, usize>,
    ) -> Option<SleepSession> {
        records.sort_by_key(|r| (r.start, r.end));

        let mut stages: Vec<SleepStageSample> = Vec::with_capacity(records.len());
        let mut covered_until: Option<DateTime<Utc>> = None;
        for record in &records {
            let start = match covered_until {
                Some(until) if until > record.start => until,
                _ => record.start,
            };
            if record.end <= start {
                continue;
            }
            stages.push(SleepStageSample {
                start_date: start,
                end_date: record.end,
                stage: self.vocab.sleep_stage(record.stage_code),
                duration_seconds: seconds_between(start, record.end),
            });
            covered_until = Some(covered_until.map_or(record.end, |until| until.max(record.end)));
        }

        let start = stages.first()?.start_date;
        let end = covered_until?;
        let first = records.first()?;

        let mut session = SleepSession {
            id: session_id(&records, native_groups, bundle_id, night, start, end),
            source_name: first.source.name.clone(),
            source_bundle_id: bundle_id.to_string(),
            start_date: start,
            end_date: end,
            title: records
                .iter()
                .find_map(|r| r.session_title.clone())
                .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string()),
            duration_seconds: seconds_between(start, end),
            stages: Vec::new(),
            time_in_bed: 0.0,
            sleep_time: 0.0,
            deep_sleep_time: 0.0,
            rem_sleep_time: 0.0,
            light_sleep_time: 0.0,
            awake_time: 0.0,
        };

        for stage in &stages {
            let seconds = stage.duration_seconds;
            session.time_in_bed += seconds;
            if stage.stage.is_asleep() {
                session.sleep_time += seconds;
            }
            match stage.stage {
                SleepStage::Awake => session.awake_time += seconds,
                SleepStage::Light => session.light_sleep_time += seconds,
                SleepStage::Deep => session.deep_sleep_time += seconds,
                SleepStage::Rem => session.rem_sleep_time += seconds,
                SleepStage::Unknown | SleepStage::Sleeping | SleepStage::OutOfBed => {}
            }
        }
        session.stages = stages;
        Some(session)
    }
}

/// Native session id shared by every record of a group
fn shared_native_id(records: &[RawSleepStage]) -> Option<&str> {
    let native = records.first()?.session_id.as_deref()?;
    records
        .iter()
        .all(|r| r.session_id.as_deref() == Some(native))
        .then_some(native)
}

/// Native session id when the whole group shares one that no other group
/// carries, else an id derived from the group's identity so the same records
/// always yield the same id
fn session_id(
    records: &[RawSleepStage],
    native_groups: &BTreeMap<String, usize>,
    bundle_id: &str,
    night: NaiveDate,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    let name = match shared_native_id(records) {
        Some(native) if native_groups.get(native).copied().unwrap_or(0) <= 1 => {
            return native.to_string();
        }
        Some(native) => format!("{native}|{night}"),
        None => format!(
            "{}|{}|{}|{}",
            bundle_id,
            night,
            start.timestamp_millis(),
            end.timestamp_millis()
        ),
    };
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
