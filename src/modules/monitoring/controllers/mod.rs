pub mod monitoring_controller;
