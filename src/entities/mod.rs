pub mod tmdb_movie;
