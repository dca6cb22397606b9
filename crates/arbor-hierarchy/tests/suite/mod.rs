mod change_tracking;
mod discovery_builds;
mod fixtures;
mod region_builds;
mod snapshots;
