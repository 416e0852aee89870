//! Per-network statistics for measurements that carry a Wi-Fi name.

use std::collections::BTreeMap;

use super::types::{ConsensusError, Coordinates, MeasurementRecord, NetworkStatistics};
use super::ConsensusAggregator;

/// Group records by `wifi_name` and aggregate each group.
///
/// Records without a network name are skipped. Groups are returned sorted by
/// name; the latest timestamp is the newest parseable one in the group.
pub fn summarize_by_network(
    records: &[MeasurementRecord],
    aggregator: &ConsensusAggregator,
) -> Result<Vec<NetworkStatistics>, ConsensusError> {
    let mut groups: BTreeMap<&str, Vec<&MeasurementRecord>> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.wifi_name.as_deref() {
            groups.entry(name).or_default().push(record);
        }
    }

    let mut summaries = Vec::with_capacity(groups.len());
    for (name, group) in groups {
        let speeds: Vec<f64> = group.iter().map(|r| r.speed).collect();
        let stats = aggregator.aggregate(&speeds)?;

        let latest_timestamp = group
            .iter()
            .filter_map(|r| r.parsed_timestamp().map(|ts| (ts, &r.timestamp)))
            .max_by_key(|(ts, _)| *ts)
            .map(|(_, raw)| raw.clone())
            .unwrap_or_default();

        summaries.push(NetworkStatistics {
            wifi_name: name.to_string(),
            total_measurements: stats.total_inputs,
            average_speed: stats.average_speed,
            median_speed: stats.median_speed,
            min_speed: stats.min_speed,
            max_speed: stats.max_speed,
            speed_range: stats.speed_range,
            locations: group
                .iter()
                .map(|r| Coordinates { lat: r.lat, lon: r.lon })
                .collect(),
            latest_timestamp,
        });
    }

    Ok(summaries)
}
