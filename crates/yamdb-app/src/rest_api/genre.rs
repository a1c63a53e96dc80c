use yamdb_dal::genre::{CreateGenre, GenreRepository};

use crate::slug_api;

slug_api!(Genre);
