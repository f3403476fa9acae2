mod pipeline;
mod web;
