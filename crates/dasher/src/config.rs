use crate::error::DasherConfigError;

/// SRD tile descriptor for one representation input (spec §4.2 `tileInfo[]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    pub source_id: usize,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub total_w: u32,
    pub total_h: u32,
}

/// Manifest artifact format to emit (spec §6 "Manifest artifact format").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    #[default]
    Dash,
    Hls,
}

/// Static configuration for a [`crate::Dasher`] instance (spec §4.2
/// "Configuration (enumerated)").
#[derive(Debug, Clone)]
pub struct DasherConfig {
    pub live: bool,
    /// Target segment duration in CR units. Zero enables segment-timeline mode.
    pub seg_duration_in_180k: u64,
    pub time_shift_buffer_depth_in_180k: Option<u64>,
    pub min_buffer_time_in_180k: Option<u64>,
    pub min_update_period_in_180k: Option<u64>,
    /// Non-zero starts a new Period (and subfolder) at each multiple.
    pub multi_period_folders_in_180k: u64,
    pub base_url_prefixes: Vec<String>,
    pub initial_offset_in_180k: i64,
    pub segments_not_owned: bool,
    pub presignal_next_segment: bool,
    pub force_real_durations: bool,
    pub tile_info: Vec<TileInfo>,
    pub manifest_format: ManifestFormat,
}

impl Default for DasherConfig {
    fn default() -> Self {
        Self {
            live: false,
            seg_duration_in_180k: 3 * media_types::CLOCK_RATE,
            time_shift_buffer_depth_in_180k: None,
            min_buffer_time_in_180k: None,
            min_update_period_in_180k: None,
            multi_period_folders_in_180k: 0,
            base_url_prefixes: Vec::new(),
            initial_offset_in_180k: 0,
            segments_not_owned: false,
            presignal_next_segment: false,
            force_real_durations: false,
            tile_info: Vec::new(),
            manifest_format: ManifestFormat::default(),
        }
    }
}

impl DasherConfig {
    /// `timeline mode` (spec §4.2 step 2: "Zero enables segment-timeline mode").
    pub fn is_timeline_mode(&self) -> bool {
        self.seg_duration_in_180k == 0
    }

    /// Validate the cross-field constraints of spec §4.2 "Constraints".
    /// `num_inputs` is known only once the Dasher has seen its first
    /// `process()` call, so this is invoked lazily rather than at construction.
    pub fn validate(&self, num_inputs: usize) -> Result<(), DasherConfigError> {
        if self.is_timeline_mode() && self.presignal_next_segment {
            return Err(DasherConfigError::TimelineWithPresignal);
        }
        if self.is_timeline_mode() && self.segments_not_owned {
            return Err(DasherConfigError::TimelineWithSegmentsNotOwned);
        }
        if self.time_shift_buffer_depth_in_180k.is_some() && self.multi_period_folders_in_180k != 0
        {
            return Err(DasherConfigError::TimeshiftWithMultiPeriod);
        }
        if !self.tile_info.is_empty() && self.tile_info.len() != num_inputs {
            return Err(DasherConfigError::TileInfoCountMismatch {
                tiles: self.tile_info.len(),
                inputs: num_inputs,
            });
        }
        Ok(())
    }
}
