mod index;
mod retrieval;
