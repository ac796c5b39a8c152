//! Conversion between local measurements and remote entries.

use scalesync_core::Measurement;

use crate::date_key;
use crate::types::RemoteEntry;

/// Build the create/update body for a measurement. The id stays unassigned.
pub fn to_remote(measurement: &Measurement) -> RemoteEntry {
    to_remote_with_key(measurement, date_key::encode(measurement.timestamp))
}

/// Same as [`to_remote`] with an already encoded wire date.
pub fn to_remote_with_key(measurement: &Measurement, date: String) -> RemoteEntry {
    RemoteEntry {
        id: 0,
        date,
        weight: measurement.weight,
        fat: measurement.fat,
        water: measurement.water,
        muscle: measurement.muscle,
    }
}

/// Whether `entry` is the remote counterpart of `measurement` (exact wire date match).
pub fn looks_matched(entry: &RemoteEntry, measurement: &Measurement) -> bool {
    entry.date == date_key::encode(measurement.timestamp)
}
