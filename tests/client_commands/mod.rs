mod annotations;
mod lookups;
