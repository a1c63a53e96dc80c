crate::slug_repository!(Category, "category");
