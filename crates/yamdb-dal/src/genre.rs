crate::slug_repository!(Genre, "genre");
