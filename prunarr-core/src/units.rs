//! Unit conversions for the input/display boundary.
//!
//! The rule builder shows file sizes in GB and bitrates in Mbps; persisted
//! criteria and the evaluator always use the canonical units (bytes, kbps).
//! Conversion happens here and nowhere else.

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;
const KBPS_PER_MBPS: f64 = 1000.0;

/// UI gigabytes to stored bytes.
pub fn gb_to_bytes(gb: f64) -> i64 {
    (gb * BYTES_PER_GB).round() as i64
}

/// Stored bytes to UI gigabytes.
pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

/// UI megabits-per-second to stored kbps.
pub fn mbps_to_kbps(mbps: f64) -> i64 {
    (mbps * KBPS_PER_MBPS).round() as i64
}

/// Stored kbps to UI megabits-per-second.
pub fn kbps_to_mbps(kbps: i64) -> f64 {
    kbps as f64 / KBPS_PER_MBPS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_round_trip_within_tolerance() {
        for gb in [0.1, 0.5, 1.0, 2.5, 47.3, 512.0] {
            let stored = gb_to_bytes(gb);
            let displayed = bytes_to_gb(stored);
            assert!(
                (displayed - gb).abs() < 1e-9,
                "{gb} GB round-tripped to {displayed}"
            );
        }
    }

    #[test]
    fn bitrate_round_trip_within_tolerance() {
        for mbps in [0.5, 1.0, 8.0, 25.5, 120.0] {
            let stored = mbps_to_kbps(mbps);
            let displayed = kbps_to_mbps(stored);
            assert!(
                (displayed - mbps).abs() < 1e-9,
                "{mbps} Mbps round-tripped to {displayed}"
            );
        }
    }

    #[test]
    fn canonical_values_are_integers() {
        assert_eq!(gb_to_bytes(1.0), 1_073_741_824);
        assert_eq!(mbps_to_kbps(8.0), 8_000);
    }
}
