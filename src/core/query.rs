use crate::core::distance::haversine_miles;
use crate::models::{LookupField, Record, Role};
use serde::Serialize;

/// A record borrowed from the loaded table together with its distance from
/// the center and its role in the result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyEntry<'a> {
    pub record: &'a Record,
    pub distance_miles: f64,
    pub role: Role,
}

/// Point handed to a map renderer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPoint {
    pub lat: f64,
    pub lon: f64,
    pub role: Role,
    pub name: String,
}

/// Outcome of a radius query
///
/// `center` is `None` when the target key matched no row. That is a normal
/// outcome and `neighbors` is empty in that case.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    pub center: Option<NearbyEntry<'a>>,
    pub neighbors: Vec<NearbyEntry<'a>>,
}

impl<'a> QueryResult<'a> {
    pub fn not_found() -> Self {
        Self {
            center: None,
            neighbors: Vec::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.center.is_some()
    }

    /// Center first, then neighbors in ranked order
    pub fn map_points(&self) -> Vec<MapPoint> {
        self.center
            .iter()
            .chain(self.neighbors.iter())
            .map(|entry| MapPoint {
                lat: entry.record.latitude,
                lon: entry.record.longitude,
                role: entry.role,
                name: entry.record.identifier.clone(),
            })
            .collect()
    }
}

/// Find every record within `radius_miles` of the record matching `target_key`
///
/// The target is the first row, in table order, whose `lookup` field equals
/// `target_key` ignoring case. Every other row is measured against it, even
/// when it is a duplicate at the same coordinates. Rows with a distance
/// `<= radius_miles` are kept and sorted ascending; ties keep table order.
pub fn find_nearby<'a>(
    table: &'a [Record],
    target_key: &str,
    radius_miles: f64,
    lookup: LookupField,
) -> QueryResult<'a> {
    let wanted = target_key.to_lowercase();

    let Some(center_idx) = table
        .iter()
        .position(|record| record.key(lookup).to_lowercase() == wanted)
    else {
        tracing::debug!("No record matches {:?} by {:?}", target_key, lookup);
        return QueryResult::not_found();
    };

    let center = &table[center_idx];

    let mut neighbors: Vec<NearbyEntry<'a>> = table
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != center_idx)
        .filter_map(|(_, record)| {
            let distance_miles = haversine_miles(
                center.latitude,
                center.longitude,
                record.latitude,
                record.longitude,
            );

            (distance_miles <= radius_miles).then_some(NearbyEntry {
                record,
                distance_miles,
                role: Role::Nearby,
            })
        })
        .collect();

    // Vec::sort_by is stable, so equal distances stay in table order.
    neighbors.sort_by(|a, b| a.distance_miles.total_cmp(&b.distance_miles));

    tracing::debug!(
        "{} of {} records within {} mi of {:?}",
        neighbors.len(),
        table.len() - 1,
        radius_miles,
        center.identifier
    );

    QueryResult {
        center: Some(NearbyEntry {
            record: center,
            distance_miles: 0.0,
            role: Role::Center,
        }),
        neighbors,
    }
}
