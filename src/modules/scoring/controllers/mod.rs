pub mod credit_score_controller;
