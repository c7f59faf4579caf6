/// Entity CRUD against a live database
pub mod crud_tests;
