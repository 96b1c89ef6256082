mod common;

mod recipes;
