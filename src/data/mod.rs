mod astrometry;
pub use astrometry::Astrometry;

mod data_sample;
pub use data_sample::DataSample;

mod event_data;
pub use event_data::EventData;

mod photometry;
pub use photometry::Photometry;

mod sorted_array;
pub use sorted_array::SortedArray;

mod validate;
