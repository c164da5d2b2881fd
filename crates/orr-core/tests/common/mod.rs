#![allow(dead_code)]

pub mod openrouter;
