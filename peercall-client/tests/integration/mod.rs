pub mod candidate_tests;
