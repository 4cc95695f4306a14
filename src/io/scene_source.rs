use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BoundingBox, ChangeError, ChangeResult, Scene};

/// Coarse scene-level query handed to an archive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneQuery {
    /// Footprint the scenes must intersect
    pub area: BoundingBox,
    /// First acquisition date, inclusive
    pub start: NaiveDate,
    /// Last acquisition date, exclusive
    pub end: NaiveDate,
    /// Scenes need a cloudy pixel percentage strictly below this
    pub max_cloud_percentage: f32,
}

impl SceneQuery {
    pub fn validate(&self) -> ChangeResult<()> {
        if self.start >= self.end {
            return Err(ChangeError::Configuration(format!(
                "query window {} .. {} is empty", self.start, self.end
            )));
        }
        if !(0.0..=100.0).contains(&self.max_cloud_percentage) {
            return Err(ChangeError::Configuration(format!(
                "max cloud percentage {} outside [0, 100]", self.max_cloud_percentage
            )));
        }
        Ok(())
    }

    /// Scene-level filter: date window, footprint and cloud cover
    pub fn accepts(&self, scene: &Scene) -> bool {
        let date = scene.metadata.acquired.date_naive();
        date >= self.start
            && date < self.end
            && scene.geometry().bounding_box().intersects(&self.area)
            && scene.metadata.cloudy_pixel_percentage < self.max_cloud_percentage
    }
}

/// Supplies scenes for a query; the archive itself lives outside this crate
pub trait SceneSource {
    fn fetch(&self, query: &SceneQuery) -> ChangeResult<Vec<Scene>>;
}

/// Scene source over scenes already held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySceneSource {
    scenes: Vec<Scene>,
}

impl InMemorySceneSource {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

impl SceneSource for InMemorySceneSource {
    fn fetch(&self, query: &SceneQuery) -> ChangeResult<Vec<Scene>> {
        query.validate()?;
        let selected: Vec<Scene> = self
            .scenes
            .iter()
            .filter(|s| query.accepts(s))
            .cloned()
            .collect();
        log::info!("Scene query {} .. {} (< {}% cloud): {} of {} scenes",
                   query.start, query.end, query.max_cloud_percentage,
                   selected.len(), self.scenes.len());
        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CoordinateSystem, GeoTransform, Grid, GridGeometry, Raster, SceneMetadata};
    use chrono::{TimeZone, Utc};

    fn scene(id: &str, day: (i32, u32, u32), cloud: f32) -> Scene {
        let geometry = GridGeometry::new(2, 2, GeoTransform::north_up(-68.6, -31.5, 0.001), CoordinateSystem::Geographic);
        let raster = Raster::new(geometry).with_band("B4", Grid::zeros((2, 2))).unwrap();
        Scene::new(
            id,
            SceneMetadata {
                acquired: Utc.with_ymd_and_hms(day.0, day.1, day.2, 14, 30, 0).unwrap(),
                cloudy_pixel_percentage: cloud,
            },
            raster,
        )
    }

    fn query() -> SceneQuery {
        SceneQuery {
            area: BoundingBox { min_lon: -69.0, max_lon: -68.0, min_lat: -32.0, max_lat: -31.0 },
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2022, 3, 31).unwrap(),
            max_cloud_percentage: 30.0,
        }
    }

    #[test]
    fn test_coarse_filtering() {
        let source = InMemorySceneSource::new(vec![
            scene("in", (2022, 2, 10), 12.0),
            scene("end_exclusive", (2022, 3, 31), 0.0),
            scene("too_cloudy", (2022, 2, 10), 30.0),
            scene("winter", (2021, 8, 1), 0.0),
        ]);
        let scenes = source.fetch(&query()).unwrap();
        let ids: Vec<&str> = scenes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["in"]);
    }

    #[test]
    fn test_footprint_filter_and_validation() {
        let mut q = query();
        q.area = BoundingBox { min_lon: 10.0, max_lon: 11.0, min_lat: 40.0, max_lat: 41.0 };
        let source = InMemorySceneSource::new(vec![scene("in", (2022, 2, 10), 12.0)]);
        assert!(source.fetch(&q).unwrap().is_empty());

        let mut q = query();
        q.end = q.start;
        assert!(source.fetch(&q).is_err());
    }
}
