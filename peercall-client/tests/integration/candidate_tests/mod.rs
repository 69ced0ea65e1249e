mod test_end_of_candidates;
