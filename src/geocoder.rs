//! Reverse-geocode orchestration.
//!
//! A [`Geocoder`] owns a one-shot initialization of its [`GeoContext`] (record store plus
//! spatial index). The first request triggers the load; every concurrent request awaits
//! that same build and afterwards all queries share the immutable context.

use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::error::{GeolocError, Result};
use crate::models::{AdminHierarchy, Coordinate, PlaceRecord};
use crate::resolver::resolve_in;
use crate::spatial::KdTree;
use crate::store::{RecordSource, RecordStore};

/// A latitude or longitude as received from a caller, numeric or textual
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl From<f64> for CoordinateInput {
    fn from(value: f64) -> Self {
        CoordinateInput::Number(value)
    }
}

impl From<&str> for CoordinateInput {
    fn from(value: &str) -> Self {
        CoordinateInput::Text(value.to_string())
    }
}

impl From<String> for CoordinateInput {
    fn from(value: String) -> Self {
        CoordinateInput::Text(value)
    }
}

impl CoordinateInput {
    /// Coerce to a finite number. Text must parse completely (surrounding whitespace aside).
    fn to_f64(&self, field: &'static str) -> Result<f64> {
        let value = match self {
            CoordinateInput::Number(value) => *value,
            CoordinateInput::Text(text) => {
                text.trim()
                    .parse::<f64>()
                    .map_err(|_| GeolocError::InvalidCoordinate {
                        field,
                        value: text.clone(),
                        reason: "not a number",
                    })?
            }
        };

        if !value.is_finite() {
            return Err(GeolocError::InvalidCoordinate {
                field,
                value: value.to_string(),
                reason: "not a finite number",
            });
        }
        Ok(value)
    }
}

/// Parse and range-check a query point
pub fn parse_coordinate(
    latitude: impl Into<CoordinateInput>,
    longitude: impl Into<CoordinateInput>,
) -> Result<Coordinate> {
    let latitude = latitude.into().to_f64("latitude")?;
    let longitude = longitude.into().to_f64("longitude")?;

    if !(-90.0..=90.0).contains(&latitude) {
        return Err(GeolocError::InvalidCoordinate {
            field: "latitude",
            value: latitude.to_string(),
            reason: "outside [-90, 90]",
        });
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(GeolocError::InvalidCoordinate {
            field: "longitude",
            value: longitude.to_string(),
            reason: "outside [-180, 180]",
        });
    }

    Ok(Coordinate::new(latitude, longitude))
}

/// Nearest place to a query point with its administrative context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseGeocodeResult {
    pub query: Coordinate,
    pub place: Arc<PlaceRecord>,
    /// Great-circle distance from the query to the place
    pub distance_km: f64,
    #[serde(flatten)]
    pub admin: AdminHierarchy,
}

/// Record store and the spatial index built over it
#[derive(Debug)]
pub struct GeoContext {
    store: RecordStore,
    index: KdTree,
}

impl GeoContext {
    /// Index the store's places
    pub fn build(store: RecordStore) -> Result<Self> {
        let index = KdTree::build(store.places().iter().cloned())?;
        Ok(Self { store, index })
    }

    /// Nearest place to an already validated point, with its admin hierarchy resolved
    pub fn lookup(&self, point: Coordinate) -> Result<ReverseGeocodeResult> {
        let nearest = self
            .index
            .nearest(point, 1)
            .into_iter()
            .next()
            .ok_or(GeolocError::NoMatch)?;

        let admin = resolve_in(&nearest.record, &self.store);

        Ok(ReverseGeocodeResult {
            query: point,
            place: nearest.record,
            distance_km: nearest.distance_km,
            admin,
        })
    }

    pub fn index(&self) -> &KdTree {
        &self.index
    }
}

/// Initialization state of a geocoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not built yet, or build in progress
    Loading,
    Ready,
    Failed,
}

/// A running dataset build that every waiting caller polls
type BuildTask = Shared<BoxFuture<'static, Result<Arc<GeoContext>>>>;

/// Offline reverse geocoder over a lazily loaded gazetteer
pub struct Geocoder {
    source: Arc<dyn RecordSource>,
    context: OnceCell<Result<Arc<GeoContext>>>,
    /// Started build; outlives any single caller so a cancelled request never restarts it
    build: Mutex<Option<BuildTask>>,
}

impl Geocoder {
    /// Create a geocoder; nothing is loaded until the first request (or [`Geocoder::warm_up`])
    pub fn new<S: RecordSource>(source: S) -> Self {
        Self {
            source: Arc::new(source),
            context: OnceCell::new(),
            build: Mutex::new(None),
        }
    }

    /// Find the place nearest to (`latitude`, `longitude`).
    ///
    /// Input is validated before anything is loaded, so a malformed request never
    /// triggers the dataset build.
    pub async fn reverse_geocode(
        &self,
        latitude: impl Into<CoordinateInput>,
        longitude: impl Into<CoordinateInput>,
    ) -> Result<ReverseGeocodeResult> {
        let point = parse_coordinate(latitude, longitude)?;
        let context = self.context().await?;

        debug!("Look-up request for point {:?}", point);
        context.lookup(point)
    }

    /// The built context, loading it on first use.
    ///
    /// Concurrent callers share one build, which keeps running if the caller that started
    /// it is dropped. A failed build is remembered and returned to every later caller until
    /// [`Geocoder::reset`].
    pub async fn context(&self) -> Result<Arc<GeoContext>> {
        self.context
            .get_or_init(|| self.build_task())
            .await
            .clone()
    }

    /// Load and index now instead of on the first request
    pub async fn warm_up(&self) -> Result<()> {
        self.context().await.map(|_| ())
    }

    pub fn status(&self) -> Status {
        match self.context.get() {
            None => Status::Loading,
            Some(Ok(_)) => Status::Ready,
            Some(Err(_)) => Status::Failed,
        }
    }

    /// Forget the built (or failed) context; the next request loads again
    pub fn reset(&mut self) {
        let build = self
            .build
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if self.context.take().is_some() || build.is_some() {
            info!("Geocoder reset, dataset will be reloaded on next request");
        }
    }

    /// The running build, started on first call
    fn build_task(&self) -> BuildTask {
        let mut slot = self
            .build
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slot.get_or_insert_with(|| Self::initialize(Arc::clone(&self.source)))
            .clone()
    }

    fn initialize(source: Arc<dyn RecordSource>) -> BuildTask {
        info!("Loading gazetteer and building spatial index...");
        let started = Instant::now();

        let handle = tokio::task::spawn_blocking(move || {
            let store = source.load().map_err(|e| GeolocError::load(&e))?;
            GeoContext::build(store)
        });

        async move {
            let outcome = handle.await.unwrap_or_else(|e| {
                Err(GeolocError::Load(format!("initialization task failed: {}", e)))
            });

            match outcome {
                Ok(context) => {
                    info!(
                        "Geocoder ready: {} places indexed in {:?}",
                        context.index().len(),
                        started.elapsed()
                    );
                    Ok(Arc::new(context))
                }
                Err(e) => {
                    error!("Geocoder initialization failed: {}", e);
                    Err(e)
                }
            }
        }
        .boxed()
        .shared()
    }
}
