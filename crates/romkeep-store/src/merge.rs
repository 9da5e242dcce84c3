//! Merge rule applied by every save

use romkeep_api::RomRecord;

/// Combine an incoming write with the stored record.
///
/// `now` is the timestamp recorded as `last` when the write carries a
/// measured session.
pub fn merge_record(prior: Option<&RomRecord>, incoming: &RomRecord, now: &str) -> RomRecord {
    let Some(prior) = prior else {
        let mut record = incoming.clone();
        record.completed = incoming.completed.resolved();
        record.favorite = incoming.favorite.resolved();
        if !incoming.is_touch() {
            record.count = incoming.count.max(1);
            record.last_session_time = incoming.time;
            record.last = now.to_string();
        }
        return record;
    };

    let mut record = prior.clone();
    record.completed = incoming.completed.or(prior.completed);
    record.favorite = incoming.favorite.or(prior.favorite);

    if !incoming.is_touch() {
        record.last_session_time = incoming.time;
        record.time = prior.time + incoming.time;
        record.count = prior.count + 1;
        record.last = now.to_string();
    }

    record
}
