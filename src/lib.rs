pub mod bridge;
pub mod broadcast;
pub mod capture;
pub mod config;
pub mod joint;
pub mod neuron;
pub mod osc;
pub mod render;
pub mod skeleton;
