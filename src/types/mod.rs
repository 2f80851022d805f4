pub mod city;
pub mod coordinate;
pub mod units;
pub mod weather;
