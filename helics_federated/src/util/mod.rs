pub mod mpsc_sink;
