pub mod anti_dilution;
pub mod option_pool;
pub mod pro_rata;
pub mod round_processor;
