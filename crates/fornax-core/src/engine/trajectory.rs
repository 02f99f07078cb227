use super::config::PlaybackConfig;
use super::error::PlaybackError;
use super::progress::ProgressReporter;
use crate::core::color::{PositionScale, Rgb};
use crate::core::io::trajectory::RawSample;
use crate::core::structure::elements::ElementKind;
use crate::core::structure::toolkit::StructureToolkit;
use std::collections::HashMap;
use tracing::{debug, info};

/// Start of the time axis when an explicit simulation time is configured.
pub const AXIS_START: f64 = 0.1;

/// One structure of a series at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub time: f64,
    pub concentration: f64,
    pub energy: f64,
    pub structure: String,
    pub sequence: Option<String>,
    /// One entry per position; positions outside any stem have no color.
    pub colors: Vec<Option<Rgb>>,
}

/// Every sample of one structure id, sorted by time.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: String,
    pub samples: Vec<Sample>,
}

/// One column of the dominant-structure strip.
#[derive(Debug, Clone, PartialEq)]
pub struct StripColumn {
    pub time: f64,
    /// Time until the next column; 0 for the last one.
    pub dt: f64,
    pub id: String,
    pub colors: Vec<Option<Rgb>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub id: String,
    pub sequence: String,
    pub structure: String,
    pub concentration: f64,
}

/// Every structure present at one time point.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub time: f64,
    pub entries: Vec<SnapshotEntry>,
}

/// Time series of structures grouped by id, with stem colors computed once at load.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    series: Vec<Series>,
    time_axis: (f64, f64),
    sequence_length: usize,
}

impl Trajectory {
    /// Groups raw samples into per-id series.
    ///
    /// Samples at or below the configured occupancy threshold are dropped first. Series keep
    /// the order in which their ids first appear; samples within a series are sorted by time.
    /// Every stem of a sample's structure is colored by the mean of its positions, mapped
    /// onto `[0, sequence_length]`.
    ///
    /// # Errors
    ///
    /// Returns [`PlaybackError::EmptyTrajectory`] if no sample survives the threshold,
    /// [`PlaybackError::Structure`] for a structure that does not parse and
    /// [`PlaybackError::DuplicateTimestamp`] for two samples of one id at the same time.
    pub fn load(
        raw: Vec<RawSample>,
        config: &PlaybackConfig,
        toolkit: &dyn StructureToolkit,
        reporter: &ProgressReporter,
    ) -> Result<Self, PlaybackError> {
        let _phase = reporter.phase("Loading trajectory");
        let total = raw.len();
        let raw: Vec<RawSample> = match config.occupancy_threshold {
            Some(threshold) => raw
                .into_iter()
                .filter(|s| s.concentration > threshold)
                .collect(),
            None => raw,
        };
        if raw.is_empty() {
            return Err(PlaybackError::EmptyTrajectory);
        }
        if raw.len() < total {
            debug!(
                dropped = total - raw.len(),
                "Dropped samples below the occupancy threshold."
            );
        }

        let sequence_length = config.sequence_length.unwrap_or_else(|| {
            raw.iter()
                .map(|s| s.structure.chars().count())
                .max()
                .unwrap_or(0)
        });
        let scale = PositionScale::new(sequence_length);

        let mut series: Vec<Series> = Vec::new();
        let mut by_id: HashMap<String, usize> = HashMap::new();
        let mut palette: HashMap<String, Vec<Option<Rgb>>> = HashMap::new();
        {
            let task = reporter.task(raw.len() as u64);
            for sample in raw {
                let colors = match palette.get(&sample.structure) {
                    Some(colors) => colors.clone(),
                    None => {
                        let colors = stem_colors(toolkit, &scale, &sample.structure).map_err(
                            |source| PlaybackError::Structure {
                                id: sample.id.clone(),
                                time: sample.time,
                                source,
                            },
                        )?;
                        palette.insert(sample.structure.clone(), colors.clone());
                        colors
                    }
                };

                let index = *by_id.entry(sample.id.clone()).or_insert_with(|| {
                    series.push(Series {
                        id: sample.id.clone(),
                        samples: Vec::new(),
                    });
                    series.len() - 1
                });
                series[index].samples.push(Sample {
                    time: sample.time,
                    concentration: sample.concentration,
                    energy: sample.energy,
                    structure: sample.structure,
                    sequence: sample.sequence,
                    colors,
                });
                task.step();
            }
        }

        for s in &mut series {
            s.samples.sort_by(|a, b| a.time.total_cmp(&b.time));
            if let Some(pair) = s.samples.windows(2).find(|w| w[0].time == w[1].time) {
                return Err(PlaybackError::DuplicateTimestamp {
                    id: s.id.clone(),
                    time: pair[0].time,
                });
            }
        }

        let time_axis = match config.simulation_time {
            Some(end) => (AXIS_START, end),
            None => {
                let times = series.iter().flat_map(|s| s.samples.iter().map(|x| x.time));
                let (min, max) = times.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| {
                    (lo.min(t), hi.max(t))
                });
                (min, max)
            }
        };

        info!(
            series = series.len(),
            samples = series.iter().map(|s| s.samples.len()).sum::<usize>(),
            start = time_axis.0,
            end = time_axis.1,
            "Loaded trajectory."
        );
        Ok(Self {
            series,
            time_axis,
            sequence_length,
        })
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn series_by_id(&self, id: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }

    /// `(start, end)` of the playback axis.
    pub fn time_axis(&self) -> (f64, f64) {
        self.time_axis
    }

    /// Length of the position domain used for stem colors.
    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Distinct sample times across all series, ascending.
    pub fn time_points(&self) -> Vec<f64> {
        let mut times: Vec<f64> = self
            .series
            .iter()
            .flat_map(|s| s.samples.iter().map(|x| x.time))
            .collect();
        times.sort_by(f64::total_cmp);
        times.dedup();
        times
    }

    /// For every time point, the colors of the most concentrated structure.
    pub fn dominant_strip(&self) -> Vec<StripColumn> {
        let times = self.time_points();
        let mut columns = Vec::with_capacity(times.len());
        for (i, &time) in times.iter().enumerate() {
            let dominant = self
                .samples_at(time)
                .max_by(|a, b| a.1.concentration.total_cmp(&b.1.concentration));
            let Some((id, sample)) = dominant else {
                continue;
            };
            columns.push(StripColumn {
                time,
                dt: times.get(i + 1).map_or(0.0, |next| next - time),
                id: id.to_string(),
                colors: sample.colors.clone(),
            });
        }
        columns
    }

    /// Every structure present at each time point, in series order.
    ///
    /// Samples without a sequence get `N` at every position.
    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.time_points()
            .into_iter()
            .map(|time| Snapshot {
                time,
                entries: self
                    .samples_at(time)
                    .map(|(id, sample)| SnapshotEntry {
                        id: id.to_string(),
                        sequence: sample
                            .sequence
                            .clone()
                            .unwrap_or_else(|| "N".repeat(sample.structure.chars().count())),
                        structure: sample.structure.clone(),
                        concentration: sample.concentration,
                    })
                    .collect(),
            })
            .collect()
    }

    fn samples_at(&self, time: f64) -> impl Iterator<Item = (&str, &Sample)> + '_ {
        self.series.iter().filter_map(move |s| {
            s.samples
                .binary_search_by(|x| x.time.total_cmp(&time))
                .ok()
                .map(|i| (s.id.as_str(), &s.samples[i]))
        })
    }
}

fn stem_colors(
    toolkit: &dyn StructureToolkit,
    scale: &PositionScale,
    structure: &str,
) -> Result<Vec<Option<Rgb>>, crate::core::structure::StructureError> {
    let pairtable = toolkit.pairtable(structure)?;
    let mut colors = vec![None; pairtable.len()];
    for stem in toolkit
        .elements(&pairtable)
        .iter()
        .filter(|e| e.kind == ElementKind::Stem)
    {
        let Some(mean) = stem.mean_position() else {
            continue;
        };
        let color = scale.color(mean);
        for &p in &stem.positions {
            if let Some(slot) = colors.get_mut(p - 1) {
                *slot = Some(color);
            }
        }
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::structure::toolkit::DefaultToolkit;

    fn raw(time: f64, id: &str, concentration: f64, structure: &str) -> RawSample {
        RawSample {
            time,
            id: id.to_string(),
            concentration,
            energy: -1.5,
            structure: structure.to_string(),
            sequence: None,
        }
    }

    fn load(samples: Vec<RawSample>, config: &PlaybackConfig) -> Result<Trajectory, PlaybackError> {
        Trajectory::load(samples, config, &DefaultToolkit, &ProgressReporter::new())
    }

    mod grouping {
        use super::*;

        #[test]
        fn groups_by_id_and_sorts_by_time() {
            let trajectory = load(
                vec![
                    raw(3.0, "b", 0.4, "...."),
                    raw(2.0, "a", 0.5, "(..)"),
                    raw(1.0, "b", 0.6, "...."),
                ],
                &PlaybackConfig::default(),
            )
            .unwrap();

            let ids: Vec<_> = trajectory.series().iter().map(|s| s.id.as_str()).collect();
            assert_eq!(ids, ["b", "a"]);
            let times: Vec<_> = trajectory.series()[0]
                .samples
                .iter()
                .map(|s| s.time)
                .collect();
            assert_eq!(times, [1.0, 3.0]);
            assert_eq!(trajectory.time_axis(), (1.0, 3.0));
        }

        #[test]
        fn duplicate_timestamps_are_rejected() {
            let result = load(
                vec![raw(1.0, "a", 0.5, "...."), raw(1.0, "a", 0.3, "(..)")],
                &PlaybackConfig::default(),
            );
            assert!(matches!(
                result,
                Err(PlaybackError::DuplicateTimestamp { ref id, time }) if id == "a" && time == 1.0
            ));
        }

        #[test]
        fn threshold_drops_low_occupancy_samples() {
            let config = PlaybackConfig {
                occupancy_threshold: Some(0.01),
                ..PlaybackConfig::default()
            };
            let trajectory = load(
                vec![raw(1.0, "a", 0.5, "...."), raw(1.0, "b", 0.01, "(..)")],
                &config,
            )
            .unwrap();
            assert_eq!(trajectory.series().len(), 1);
            assert!(trajectory.series_by_id("b").is_none());

            assert!(matches!(
                load(vec![raw(1.0, "a", 0.005, "....")], &config),
                Err(PlaybackError::EmptyTrajectory)
            ));
        }

        #[test]
        fn malformed_structures_name_the_sample() {
            let result = load(vec![raw(2.5, "x", 0.5, "((..")], &PlaybackConfig::default());
            assert!(matches!(
                result,
                Err(PlaybackError::Structure { ref id, time, .. }) if id == "x" && time == 2.5
            ));
        }

        #[test]
        fn simulation_time_fixes_the_axis() {
            let config = PlaybackConfig {
                simulation_time: Some(10.0),
                ..PlaybackConfig::default()
            };
            let trajectory = load(vec![raw(1.0, "a", 0.5, "....")], &config).unwrap();
            assert_eq!(trajectory.time_axis(), (AXIS_START, 10.0));
        }
    }

    mod coloring {
        use super::*;

        #[test]
        fn stems_share_one_color_and_loops_have_none() {
            let trajectory =
                load(vec![raw(1.0, "a", 1.0, "((...))")], &PlaybackConfig::default()).unwrap();
            let colors = &trajectory.series()[0].samples[0].colors;
            let stem = Some(PositionScale::new(7).color(4.0));

            assert_eq!(colors.len(), 7);
            assert_eq!(colors[0], stem);
            assert_eq!(colors[1], stem);
            assert_eq!(colors[5], stem);
            assert_eq!(colors[6], stem);
            assert_eq!(colors[2], None);
            assert_eq!(colors[3], None);
        }

        #[test]
        fn configured_length_sets_the_color_domain() {
            let config = PlaybackConfig {
                sequence_length: Some(100),
                ..PlaybackConfig::default()
            };
            let trajectory = load(vec![raw(1.0, "a", 1.0, "((...))")], &config).unwrap();
            assert_eq!(trajectory.sequence_length(), 100);
            assert_eq!(
                trajectory.series()[0].samples[0].colors[0],
                Some(PositionScale::new(100).color(4.0))
            );
        }

        #[test]
        fn unpaired_structures_are_uncolored() {
            let trajectory =
                load(vec![raw(1.0, "a", 1.0, "....")], &PlaybackConfig::default()).unwrap();
            assert!(
                trajectory.series()[0].samples[0]
                    .colors
                    .iter()
                    .all(Option::is_none)
            );
        }
    }

    mod views {
        use super::*;

        fn trajectory() -> Trajectory {
            load(
                vec![
                    raw(1.0, "a", 0.7, "....."),
                    raw(1.0, "b", 0.3, "(...)"),
                    raw(2.0, "a", 0.2, "....."),
                    raw(2.0, "b", 0.8, "(...)"),
                    raw(4.0, "b", 1.0, "(...)"),
                ],
                &PlaybackConfig::default(),
            )
            .unwrap()
        }

        #[test]
        fn strip_follows_the_dominant_structure() {
            let strip = trajectory().dominant_strip();
            let summary: Vec<_> = strip.iter().map(|c| (c.time, c.dt, c.id.as_str())).collect();
            assert_eq!(summary, [(1.0, 1.0, "a"), (2.0, 2.0, "b"), (4.0, 0.0, "b")]);
            assert!(strip[1].colors[0].is_some());
        }

        #[test]
        fn snapshots_fill_missing_sequences() {
            let snapshots = trajectory().snapshots();
            assert_eq!(snapshots.len(), 3);
            assert_eq!(snapshots[0].entries.len(), 2);
            assert_eq!(snapshots[0].entries[0].sequence, "NNNNN");
            assert_eq!(snapshots[2].entries.len(), 1);
            assert_eq!(snapshots[2].entries[0].id, "b");
        }
    }
}
